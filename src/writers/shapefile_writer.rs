use crate::error::{ProcessingError, Result};
use crate::models::{AttributeValue, Column, ColumnKind, Layer};
use crate::readers::AttributeRow;
use crate::utils::constants::{
    ATTRIBUTE_EXTENSION, GEOMETRY_EXTENSION, INDEX_EXTENSION, MAX_CHARACTER_WIDTH,
    MAX_FIELD_NAME_BYTES, PROJECTION_EXTENSION,
};
use crate::utils::fs::{find_sibling, sibling_with_extension};
use chrono::Datelike;
use crate::utils::encoding::with_dbf_encoding;
use shapefile::dbase::{self, CodePageMark, FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::Shape;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Column as it will be laid out in the `.dbf`: dBase-safe name and a width large
/// enough for every value that will be written.
#[derive(Debug, Clone)]
struct FieldPlan {
    field_name: String,
    column: Column,
}

pub struct ShapefileWriter;

impl ShapefileWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write the layer as `.shp/.shx/.dbf` (plus `.prj` when it has a CRS).
    /// Returns the number of features written; null geometries are not representable
    /// by the writer and are dropped with a warning. Text is encoded with the code page
    /// the layer was read with, UTF-8 for new layers.
    pub fn write(&self, layer: &Layer, shp_path: &Path) -> Result<usize> {
        let plan = plan_fields(layer.columns(), layer.features().iter().map(|f| &f.attributes));
        let builder = table_builder(&plan, layer.code_page.unwrap_or(CodePageMark::Utf8))?;

        let mut written = 0;
        let mut dropped = 0;
        {
            let mut writer = shapefile::Writer::from_path(shp_path, builder)?;

            macro_rules! write_shape {
                ($shape:expr, $record:expr) => {{
                    writer.write_shape_and_record($shape, $record)?;
                    true
                }};
            }

            for feature in layer.features() {
                let record = to_record(&plan, &feature.attributes);
                let ok = match &feature.shape {
                    Shape::NullShape => false,
                    Shape::Point(s) => write_shape!(s, &record),
                    Shape::PointM(s) => write_shape!(s, &record),
                    Shape::PointZ(s) => write_shape!(s, &record),
                    Shape::Polyline(s) => write_shape!(s, &record),
                    Shape::PolylineM(s) => write_shape!(s, &record),
                    Shape::PolylineZ(s) => write_shape!(s, &record),
                    Shape::Polygon(s) => write_shape!(s, &record),
                    Shape::PolygonM(s) => write_shape!(s, &record),
                    Shape::PolygonZ(s) => write_shape!(s, &record),
                    Shape::Multipoint(s) => write_shape!(s, &record),
                    Shape::MultipointM(s) => write_shape!(s, &record),
                    Shape::MultipointZ(s) => write_shape!(s, &record),
                    Shape::Multipatch(s) => write_shape!(s, &record),
                };
                if ok {
                    written += 1;
                } else {
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            tracing::warn!(
                "Dropped {} null geometries while writing {}",
                dropped,
                shp_path.display()
            );
        }

        if let Some(crs) = &layer.crs {
            fs::write(sibling_with_extension(shp_path, PROJECTION_EXTENSION), crs)?;
        }

        Ok(written)
    }

    /// Overwrite an existing shapefile without leaving it half-written: the layer is
    /// written into a staging directory beside the target and then renamed over the
    /// existing `.shp/.shx/.dbf/.prj` files.
    pub fn write_replacing(&self, layer: &Layer, shp_path: &Path) -> Result<usize> {
        let parent = shp_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = shp_path.file_name().ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("Not a file path: {}", shp_path.display()))
        })?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(parent)?;
        let staged = staging.path().join(file_name);
        let written = self.write(layer, &staged)?;

        for extension in [
            GEOMETRY_EXTENSION,
            INDEX_EXTENSION,
            ATTRIBUTE_EXTENSION,
            PROJECTION_EXTENSION,
        ] {
            let from = sibling_with_extension(&staged, extension);
            if !from.exists() {
                continue;
            }
            let target = find_sibling(shp_path, extension)
                .unwrap_or_else(|| sibling_with_extension(shp_path, extension));
            fs::rename(&from, &target)?;
        }

        Ok(written)
    }
}

impl Default for ShapefileWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a standalone UTF-8 `.dbf` table.
pub fn write_table(path: &Path, columns: &[Column], rows: &[AttributeRow]) -> Result<()> {
    let plan = plan_fields(columns, rows.iter());
    let mut writer = table_builder(&plan, CodePageMark::Utf8)?.build_with_file_dest(path)?;
    let records: Vec<Record> = rows.iter().map(|row| to_record(&plan, row)).collect();
    writer.write_records(&records)?;
    Ok(())
}

fn plan_fields<'a, I>(columns: &[Column], rows: I) -> Vec<FieldPlan>
where
    I: Iterator<Item = &'a HashMap<String, AttributeValue>> + Clone,
{
    let mut used = HashSet::new();
    columns
        .iter()
        .map(|column| {
            let mut column = column.clone();
            let widest = rows
                .clone()
                .filter_map(|row| row.get(&column.name))
                .filter_map(|value| rendered_width(&value.coerce(column.kind), column.decimals))
                .max()
                .unwrap_or(0);
            match column.kind {
                ColumnKind::Text | ColumnKind::Number => {
                    let width = widest.max(column.width as usize).clamp(1, MAX_CHARACTER_WIDTH as usize);
                    column.width = width as u8;
                }
                ColumnKind::Boolean => column.width = 1,
                ColumnKind::Date => column.width = 8,
            }
            FieldPlan {
                field_name: dbase_field_name(&column.name, &mut used),
                column,
            }
        })
        .collect()
}

fn rendered_width(value: &AttributeValue, decimals: u8) -> Option<usize> {
    match value {
        AttributeValue::Text(s) => Some(s.len()),
        AttributeValue::Number(n) => {
            let plain = n.to_string().len();
            let fixed = format!("{:.*}", decimals as usize, n).len();
            Some(plain.max(fixed))
        }
        _ => None,
    }
}

/// dBase field names hold at most 11 bytes; truncated names that collide get a
/// numeric suffix.
fn dbase_field_name(name: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = truncate_bytes(name, MAX_FIELD_NAME_BYTES).to_string();
    let mut counter = 1;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = counter.to_string();
        candidate = format!(
            "{}{}",
            truncate_bytes(name, MAX_FIELD_NAME_BYTES - suffix.len()),
            suffix
        );
        counter += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn table_builder(plan: &[FieldPlan], code_page: CodePageMark) -> Result<TableWriterBuilder> {
    let mut builder = with_dbf_encoding!(code_page, |encoding| {
        TableWriterBuilder::with_encoding(encoding)
    });
    for field in plan {
        let name = FieldName::try_from(field.field_name.as_str()).map_err(|e| {
            ProcessingError::InvalidFormat(format!(
                "Invalid field name '{}': {:?}",
                field.field_name, e
            ))
        })?;
        builder = match field.column.kind {
            ColumnKind::Text => builder.add_character_field(name, field.column.width),
            ColumnKind::Number => {
                builder.add_numeric_field(name, field.column.width, field.column.decimals)
            }
            ColumnKind::Boolean => builder.add_logical_field(name),
            ColumnKind::Date => builder.add_date_field(name),
        };
    }
    Ok(builder)
}

fn to_record(plan: &[FieldPlan], attributes: &HashMap<String, AttributeValue>) -> Record {
    let map: HashMap<String, FieldValue> = plan
        .iter()
        .map(|field| {
            let value = attributes
                .get(&field.column.name)
                .map(|v| v.coerce(field.column.kind))
                .unwrap_or_default();
            (field.field_name.clone(), to_field_value(value, field.column.kind))
        })
        .collect();
    Record::from(map)
}

fn to_field_value(value: AttributeValue, kind: ColumnKind) -> FieldValue {
    match (kind, value) {
        (ColumnKind::Text, AttributeValue::Text(s)) => {
            FieldValue::Character(Some(truncate_bytes(&s, MAX_CHARACTER_WIDTH as usize).to_string()))
        }
        (ColumnKind::Text, _) => FieldValue::Character(None),
        (ColumnKind::Number, AttributeValue::Number(n)) => FieldValue::Numeric(Some(n)),
        (ColumnKind::Number, _) => FieldValue::Numeric(None),
        (ColumnKind::Boolean, AttributeValue::Boolean(b)) => FieldValue::Logical(Some(b)),
        (ColumnKind::Boolean, _) => FieldValue::Logical(None),
        (ColumnKind::Date, AttributeValue::Date(d)) => FieldValue::Date(Some(dbase::Date::new(
            d.day(),
            d.month(),
            d.year() as u32,
        ))),
        (ColumnKind::Date, _) => FieldValue::Date(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Feature;
    use crate::readers::LayerReader;
    use shapefile::{Point, Polyline};
    use tempfile::TempDir;

    #[test]
    fn test_field_names_are_truncated_and_unique() {
        let mut used = HashSet::new();
        assert_eq!(dbase_field_name("Well_Status", &mut used), "Well_Status");
        assert_eq!(dbase_field_name("OPERATOR_NAME_1", &mut used), "OPERATOR_NA");
        assert_eq!(dbase_field_name("OPERATOR_NAME_2", &mut used), "OPERATOR_N1");
    }

    #[test]
    fn test_text_width_grows_with_data() {
        let column = Column::text("NAME", 4);
        let row = HashMap::from([(
            "NAME".to_string(),
            AttributeValue::Text("a much longer value".into()),
        )]);
        let plan = plan_fields(std::slice::from_ref(&column), [row].iter());
        assert_eq!(plan[0].column.width, 19);
    }

    #[test]
    fn test_write_replacing_overwrites_in_place() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("road01l.shp");

        let mut layer = Layer::new("road01l");
        layer.add_column(Column::text("NAME", 10));
        let line = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        layer.push_feature(
            Feature::new(Shape::Polyline(line))
                .with_attribute("NAME", AttributeValue::Text("FM 1960".into())),
        );
        ShapefileWriter::new().write(&layer, &path)?;

        layer.set_column(
            Column::text("NAME", 10),
            vec![AttributeValue::Text("SH 249".into())],
        );
        ShapefileWriter::new().write_replacing(&layer, &path)?;

        let read = LayerReader::new().read(&path)?;
        assert_eq!(
            read.features()[0].get("NAME"),
            &AttributeValue::Text("SH 249".into())
        );
        let leftovers: Vec<_> = fs::read_dir(temp.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".staging"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    fn point_layer(column: Column, value: AttributeValue) -> Layer {
        let mut layer = Layer::new("well001_s");
        let name = column.name.clone();
        layer.add_column(column);
        layer.push_feature(Feature::new(Shape::Point(Point::new(-97.0, 31.0))).with_attribute(name, value));
        layer
    }

    #[test]
    fn test_latin1_text_survives_rewrite() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("well001_s.shp");
        let dbf = path.with_extension("dbf");
        ShapefileWriter::new().write(
            &point_layer(Column::text("LEASE", 10), AttributeValue::Text("PEXA".into())),
            &path,
        )?;

        // unmarked table holding a raw Latin-1 byte
        let mut bytes = fs::read(&dbf)?;
        bytes[29] = 0x00;
        let at = bytes.windows(4).position(|w| w == b"PEXA").unwrap();
        bytes[at + 2] = 0xD1;
        fs::write(&dbf, &bytes)?;

        let read = LayerReader::new().read(&path)?;
        let expected = AttributeValue::Text("PE\u{d1}A".into());
        assert_eq!(read.features()[0].get("LEASE"), &expected);

        ShapefileWriter::new().write_replacing(&read, &path)?;

        let bytes = fs::read(&dbf)?;
        assert!(bytes.windows(4).any(|w| w == [b'P', b'E', 0xD1, b'A']));
        let reread = LayerReader::new().read(&path)?;
        assert_eq!(reread.features()[0].get("LEASE"), &expected);
        Ok(())
    }

    #[test]
    fn test_rewrite_keeps_declared_precision() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("well001_s.shp");
        ShapefileWriter::new().write(
            &point_layer(Column::number("LAT", 19, 11), AttributeValue::Number(31.12345678901)),
            &path,
        )?;

        let read = LayerReader::new().read(&path)?;
        assert_eq!(read.column("LAT").map(|c| c.decimals), Some(11));
        ShapefileWriter::new().write_replacing(&read, &path)?;

        let reread = LayerReader::new().read(&path)?;
        assert_eq!(
            reread.features()[0].get("LAT"),
            &AttributeValue::Number(31.12345678901)
        );
        Ok(())
    }
}
