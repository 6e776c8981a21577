use crate::error::Result;
use crate::models::{AttributeValue, Column, ColumnKind};
use crate::utils::constants::{DEFAULT_NUMERIC_DECIMALS, DEFAULT_NUMERIC_WIDTH, MAX_CHARACTER_WIDTH};
use crate::utils::encoding::with_dbf_encoding;
use byteorder::{ByteOrder, LittleEndian};
use chrono::NaiveDate;
use shapefile::dbase::{self, CodePageMark, FieldType, FieldValue};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub type AttributeRow = HashMap<String, AttributeValue>;

/// Pseudo-field some dBase readers expose for the record deletion marker
const DELETION_FLAG_FIELD: &str = "DeletionFlag";

const DBF_HEADER_LEN: usize = 32;
const DBF_DESCRIPTOR_LEN: usize = 32;
const DBF_HEADER_TERMINATOR: u8 = 0x0D;
const DESCRIPTOR_NAME_LEN: usize = 11;
const DESCRIPTOR_DECIMALS_OFFSET: usize = 17;

/// A standalone dBase table: ordered columns plus rows keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    pub columns: Vec<Column>,
    pub rows: Vec<AttributeRow>,
    /// Code page mark of the source header
    pub code_page: Option<CodePageMark>,
}

impl AttributeTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        let Some(column) = self.columns.iter_mut().find(|c| c.name == from) else {
            return false;
        };
        column.name = to.to_string();
        for row in &mut self.rows {
            if let Some(value) = row.remove(from) {
                row.insert(to.to_string(), value);
            }
        }
        true
    }
}

pub struct AttributeTableReader;

impl AttributeTableReader {
    pub fn new() -> Self {
        Self
    }

    /// Read a `.dbf` file into columns and rows. Text is decoded with the code page
    /// named in the header; unmarked tables are read as Windows-1252.
    pub fn read(&self, path: &Path) -> Result<AttributeTable> {
        let decimals = declared_decimals(path)?;
        let mut reader = dbase::Reader::from_path(path)?;
        let code_page = reader.header().code_page_mark;
        with_dbf_encoding!(code_page, |encoding| reader.set_encoding(encoding));

        let fields: Vec<(String, FieldType, u8)> = reader
            .fields()
            .iter()
            .filter(|f| f.name() != DELETION_FLAG_FIELD)
            .map(|f| (f.name().to_string(), f.field_type(), f.length()))
            .collect();
        let records = reader.read()?;

        let rows: Vec<AttributeRow> = records
            .iter()
            .map(|record| {
                fields
                    .iter()
                    .map(|(name, _, _)| {
                        let value = record.get(name).map(convert_value).unwrap_or_default();
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect();

        let columns = fields
            .iter()
            .map(|(name, field_type, length)| {
                column_for_field(
                    name,
                    *field_type,
                    *length,
                    decimals.get(name).copied().unwrap_or(0),
                    &rows,
                )
            })
            .collect();

        Ok(AttributeTable {
            columns,
            rows,
            code_page: Some(code_page),
        })
    }
}

fn convert_value(value: &FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            let text = s.trim_end();
            if text.is_empty() {
                AttributeValue::Null
            } else {
                AttributeValue::Text(text.to_string())
            }
        }
        FieldValue::Numeric(Some(n)) => AttributeValue::Number(*n),
        FieldValue::Float(Some(f)) => AttributeValue::Number(*f as f64),
        FieldValue::Integer(i) => AttributeValue::Number(*i as f64),
        FieldValue::Double(d) | FieldValue::Currency(d) => AttributeValue::Number(*d),
        FieldValue::Logical(Some(b)) => AttributeValue::Boolean(*b),
        FieldValue::Date(Some(d)) => NaiveDate::from_ymd_opt(d.year() as i32, d.month(), d.day())
            .map(AttributeValue::Date)
            .unwrap_or_default(),
        _ => AttributeValue::Null,
    }
}

/// Declared decimal count of every field, keyed by field name. The dBase reader keeps
/// this private, so it is taken from byte 17 of each 32-byte field descriptor.
fn declared_decimals(path: &Path) -> Result<HashMap<String, u8>> {
    let mut file = BufReader::new(File::open(path)?);
    let mut header = [0u8; DBF_HEADER_LEN];
    file.read_exact(&mut header)?;
    let header_len = LittleEndian::read_u16(&header[8..10]) as usize;

    let mut decimals = HashMap::new();
    let mut offset = DBF_HEADER_LEN;
    let mut descriptor = [0u8; DBF_DESCRIPTOR_LEN];
    while offset + DBF_DESCRIPTOR_LEN <= header_len {
        file.read_exact(&mut descriptor[..1])?;
        if descriptor[0] == DBF_HEADER_TERMINATOR {
            break;
        }
        file.read_exact(&mut descriptor[1..])?;
        let name = &descriptor[..DESCRIPTOR_NAME_LEN];
        let end = name.iter().position(|&b| b == 0).unwrap_or(DESCRIPTOR_NAME_LEN);
        let name = String::from_utf8_lossy(&name[..end]).into_owned();
        decimals.insert(name, descriptor[DESCRIPTOR_DECIMALS_OFFSET]);
        offset += DBF_DESCRIPTOR_LEN;
    }
    Ok(decimals)
}

impl Default for AttributeTableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Describe a dBase field as a column. Numeric fields keep their declared decimal
/// count; binary floats that declare none but hold fractions get eight.
fn column_for_field(
    name: &str,
    field_type: FieldType,
    length: u8,
    declared_decimals: u8,
    rows: &[AttributeRow],
) -> Column {
    let kind = match field_type {
        FieldType::Character | FieldType::Memo => ColumnKind::Text,
        FieldType::Numeric
        | FieldType::Float
        | FieldType::Integer
        | FieldType::Double
        | FieldType::Currency => ColumnKind::Number,
        FieldType::Logical => ColumnKind::Boolean,
        FieldType::Date => ColumnKind::Date,
        _ => ColumnKind::Text,
    };

    match kind {
        ColumnKind::Number if declared_decimals > 0 => {
            Column::number(name, length.max(declared_decimals.saturating_add(2)), declared_decimals)
        }
        ColumnKind::Number => {
            let fractional = rows
                .iter()
                .filter_map(|row| row.get(name).and_then(AttributeValue::as_f64))
                .any(|n| n.fract() != 0.0);
            if fractional {
                Column::number(
                    name,
                    length.max(DEFAULT_NUMERIC_WIDTH),
                    DEFAULT_NUMERIC_DECIMALS,
                )
            } else {
                Column::number(name, length.max(1), 0)
            }
        }
        ColumnKind::Text => Column::text(name, (length as usize).min(MAX_CHARACTER_WIDTH as usize)),
        ColumnKind::Boolean => Column::new(name, ColumnKind::Boolean, 1, 0),
        ColumnKind::Date => Column::new(name, ColumnKind::Date, 8, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::shapefile_writer::write_table;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_read_table_round_trip_types() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("api0001.dbf");

        let columns = vec![
            Column::text("APINUM", 10),
            Column::number("DEPTH", 10, 0),
            Column::number("RATIO", 19, 4),
        ];
        let mut row = AttributeRow::new();
        row.insert("APINUM".into(), AttributeValue::Text("4200100001".into()));
        row.insert("DEPTH".into(), AttributeValue::Number(1200.0));
        row.insert("RATIO".into(), AttributeValue::Number(0.25));
        let mut blank = AttributeRow::new();
        blank.insert("APINUM".into(), AttributeValue::Text("4200100002".into()));
        write_table(&path, &columns, &[row, blank])?;

        let table = AttributeTableReader::new().read(&path)?;

        assert_eq!(table.len(), 2);
        assert!(table.has_column("APINUM"));
        assert_eq!(
            table.rows[0].get("APINUM"),
            Some(&AttributeValue::Text("4200100001".into()))
        );
        assert_eq!(table.rows[0].get("DEPTH"), Some(&AttributeValue::Number(1200.0)));
        assert_eq!(table.rows[1].get("DEPTH"), Some(&AttributeValue::Null));
        let ratio = table.columns.iter().find(|c| c.name == "RATIO").unwrap();
        assert_eq!(ratio.decimals, 4);
        Ok(())
    }

    #[test]
    fn test_declared_decimals_are_kept() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("api0002.dbf");
        let columns = vec![
            Column::text("APINUM", 10),
            Column::number("LAT", 19, 11),
            Column::number("DEPTH", 10, 0),
        ];
        let row = AttributeRow::from([
            ("APINUM".to_string(), AttributeValue::Text("4200100001".into())),
            ("LAT".to_string(), AttributeValue::Number(31.0)),
            ("DEPTH".to_string(), AttributeValue::Number(1200.0)),
        ]);
        write_table(&path, &columns, &[row])?;

        let decimals = declared_decimals(&path)?;
        assert_eq!(decimals.get("LAT"), Some(&11));
        assert_eq!(decimals.get("APINUM"), Some(&0));

        let table = AttributeTableReader::new().read(&path)?;
        let lat = table.columns.iter().find(|c| c.name == "LAT").unwrap();
        assert_eq!((lat.width, lat.decimals), (19, 11));
        let depth = table.columns.iter().find(|c| c.name == "DEPTH").unwrap();
        assert_eq!(depth.decimals, 0);
        Ok(())
    }

    #[test]
    fn test_rename_column() {
        let mut table = AttributeTable {
            columns: vec![Column::text("APINUM", 10)],
            rows: vec![AttributeRow::from([(
                "APINUM".to_string(),
                AttributeValue::Text("1".into()),
            )])],
            ..AttributeTable::default()
        };
        assert!(table.rename_column("APINUM", "API"));
        assert!(table.has_column("API"));
        assert!(table.rows[0].contains_key("API"));
    }
}
