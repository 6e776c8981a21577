use crate::error::Result;
use crate::models::{AttributeValue, Column, ColumnKind, Layer};
use crate::utils::constants::{
    GPKG_APPLICATION_ID, GPKG_CUSTOM_SRS_BASE, GPKG_GEOMETRY_COLUMN, GPKG_UNDEFINED_CARTESIAN_SRS,
    GPKG_USER_VERSION,
};
use crate::writers::wkb::{self, EncodedGeometry, Envelope};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

const FID_COLUMN: &str = "fid";

const CORE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE IF NOT EXISTS gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE IF NOT EXISTS gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
INSERT OR IGNORE INTO gpkg_spatial_ref_sys VALUES
    ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
    ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system'),
    ('WGS 84 geodetic', 4326, 'EPSG', 4326,
     'GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],AUTHORITY[\"EPSG\",\"4326\"]]',
     'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid');
";

/// Multi-layer GeoPackage container. Opening an existing file keeps its layers;
/// each [`GeoPackageWriter::write_layer`] call adds or replaces exactly one.
pub struct GeoPackageWriter {
    conn: Connection,
}

impl GeoPackageWriter {
    /// Open (creating on first use) the container and make sure the core tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&format!(
            "PRAGMA application_id = {};\nPRAGMA user_version = {};\n{}",
            GPKG_APPLICATION_ID, GPKG_USER_VERSION, CORE_TABLES
        ))?;
        Ok(Self { conn })
    }

    /// Write `layer` as the feature table `table_name`, replacing any previous table of
    /// that name. Everything happens in one transaction, so a failure leaves the
    /// container as it was. Returns the number of features stored.
    pub fn write_layer(&mut self, table_name: &str, layer: &Layer) -> Result<usize> {
        let with_z = layer.features().iter().any(|f| wkb::shape_has_z(&f.shape));
        let geometries = layer
            .features()
            .iter()
            .map(|f| wkb::encode_shape(&f.shape, with_z))
            .collect::<Result<Vec<Option<EncodedGeometry>>>>()?;

        let geometry_type = geometry_type_name(&geometries);
        let extent = extent_of(&geometries);
        let sql_names = sql_column_names(layer.columns());

        let tx = self.conn.transaction()?;
        let srs_id = resolve_srs_id(&tx, layer.crs.as_deref())?;

        tx.execute(
            "DELETE FROM gpkg_geometry_columns WHERE table_name = ?1",
            params![table_name],
        )?;
        tx.execute(
            "DELETE FROM gpkg_contents WHERE table_name = ?1",
            params![table_name],
        )?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote(table_name)))?;

        let mut definitions = vec![
            format!("{} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL", quote(FID_COLUMN)),
            format!("{} {}", quote(GPKG_GEOMETRY_COLUMN), geometry_type),
        ];
        for (column, name) in layer.columns().iter().zip(&sql_names) {
            definitions.push(format!("{} {}", quote(name), sql_type(column)));
        }
        tx.execute_batch(&format!(
            "CREATE TABLE {} ({});",
            quote(table_name),
            definitions.join(", ")
        ))?;

        let insert_columns: Vec<String> = std::iter::once(GPKG_GEOMETRY_COLUMN.to_string())
            .chain(sql_names.iter().cloned())
            .map(|name| quote(&name))
            .collect();
        let placeholders: Vec<String> = (1..=insert_columns.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table_name),
            insert_columns.join(", "),
            placeholders.join(", ")
        );

        let mut written = 0;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for (feature, geometry) in layer.features().iter().zip(&geometries) {
                let mut values = Vec::with_capacity(insert_columns.len());
                values.push(match geometry {
                    Some(g) => Value::Blob(wkb::gpkg_blob(srs_id, g)?),
                    None => Value::Null,
                });
                for column in layer.columns() {
                    values.push(sql_value(feature.get(&column.name), column));
                }
                stmt.execute(rusqlite::params_from_iter(values.iter()))?;
                written += 1;
            }
        }

        let (min_x, min_y, max_x, max_y) = match extent {
            Some(e) => (Some(e.min_x), Some(e.min_y), Some(e.max_x), Some(e.max_y)),
            None => (None, None, None, None),
        };
        tx.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id)
             VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6)",
            params![table_name, min_x, min_y, max_x, max_y, srs_id],
        )?;
        tx.execute(
            "INSERT INTO gpkg_geometry_columns (table_name, column_name, geometry_type_name, srs_id, z, m)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![table_name, GPKG_GEOMETRY_COLUMN, geometry_type, srs_id, with_z as i32],
        )?;

        tx.commit()?;
        Ok(written)
    }

    /// Feature tables currently registered in the container
    pub fn layer_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY table_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn feature_count(&self, table_name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(table_name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// One `gpkg_spatial_ref_sys` row per distinct WKT; layers without a CRS use the
/// undefined cartesian entry.
fn resolve_srs_id(conn: &Connection, crs: Option<&str>) -> Result<i32> {
    let Some(wkt) = crs else {
        return Ok(GPKG_UNDEFINED_CARTESIAN_SRS);
    };

    let existing: Option<i32> = conn
        .query_row(
            "SELECT srs_id FROM gpkg_spatial_ref_sys WHERE definition = ?1",
            params![wkt],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let highest: Option<i32> = conn.query_row(
        "SELECT MAX(srs_id) FROM gpkg_spatial_ref_sys WHERE srs_id >= ?1",
        params![GPKG_CUSTOM_SRS_BASE],
        |row| row.get(0),
    )?;
    let srs_id = highest.map_or(GPKG_CUSTOM_SRS_BASE, |id| id + 1);

    conn.execute(
        "INSERT INTO gpkg_spatial_ref_sys (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
         VALUES (?1, ?2, 'NONE', ?2, ?3, NULL)",
        params![srs_name(wkt), srs_id, wkt],
    )?;
    Ok(srs_id)
}

/// Name of the CRS: the first quoted string of the WKT.
fn srs_name(wkt: &str) -> String {
    wkt.split('"')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn geometry_type_name(geometries: &[Option<EncodedGeometry>]) -> &'static str {
    let mut kinds = geometries.iter().flatten().map(|g| g.kind);
    match kinds.next() {
        Some(first) if kinds.all(|k| k == first) => first.gpkg_name(),
        _ => "GEOMETRY",
    }
}

fn extent_of(geometries: &[Option<EncodedGeometry>]) -> Option<Envelope> {
    geometries
        .iter()
        .flatten()
        .filter_map(|g| g.envelope)
        .reduce(|mut acc, e| {
            acc.expand(&e);
            acc
        })
}

/// SQLite column names are case-insensitive and `fid`/`geom` are taken, so clashing
/// attribute names get a numeric suffix.
fn sql_column_names(columns: &[Column]) -> Vec<String> {
    let mut used: HashSet<String> = [FID_COLUMN, GPKG_GEOMETRY_COLUMN]
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    columns
        .iter()
        .map(|column| {
            let mut candidate = column.name.clone();
            let mut counter = 1;
            while used.contains(&candidate.to_lowercase()) {
                candidate = format!("{}_{}", column.name, counter);
                counter += 1;
            }
            used.insert(candidate.to_lowercase());
            candidate
        })
        .collect()
}

fn sql_type(column: &Column) -> &'static str {
    match column.kind {
        ColumnKind::Text => "TEXT",
        ColumnKind::Number if column.decimals == 0 => "INTEGER",
        ColumnKind::Number => "REAL",
        ColumnKind::Boolean => "BOOLEAN",
        ColumnKind::Date => "DATE",
    }
}

fn sql_value(value: &AttributeValue, column: &Column) -> Value {
    match value.coerce(column.kind) {
        AttributeValue::Null => Value::Null,
        AttributeValue::Text(s) => Value::Text(s),
        AttributeValue::Number(n)
            if column.decimals == 0 && n.fract() == 0.0 && n.abs() < i64::MAX as f64 =>
        {
            Value::Integer(n as i64)
        }
        AttributeValue::Number(n) => Value::Real(n),
        AttributeValue::Boolean(b) => Value::Integer(b as i64),
        AttributeValue::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Feature;
    use pretty_assertions::assert_eq;
    use shapefile::{Point, Polyline, Shape};
    use tempfile::TempDir;

    const NAD27: &str = "GEOGCS[\"GCS_North_American_1927\",DATUM[\"D_North_American_1927\"]]";

    fn point_layer(name: &str, count: usize) -> Layer {
        let mut layer = Layer::new(name).with_crs(Some(NAD27.to_string()));
        layer.add_column(Column::text("API", 10));
        layer.add_column(Column::number("SymNum", 4, 0));
        for i in 0..count {
            layer.push_feature(
                Feature::new(Shape::Point(Point::new(-97.0 + i as f64, 31.0)))
                    .with_attribute("API", AttributeValue::Text(format!("0010000{}", i)))
                    .with_attribute("SymNum", AttributeValue::Number(4.0)),
            );
        }
        layer
    }

    #[test]
    fn test_write_layer_registers_contents() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("out.gpkg");
        let mut writer = GeoPackageWriter::open(&path)?;

        let written = writer.write_layer("Wells_SHLpts", &point_layer("merge", 3))?;

        assert_eq!(written, 3);
        assert_eq!(writer.layer_names()?, vec!["Wells_SHLpts".to_string()]);
        assert_eq!(writer.feature_count("Wells_SHLpts")?, 3);

        let (geometry_type, srs_id): (String, i32) = writer.conn.query_row(
            "SELECT geometry_type_name, srs_id FROM gpkg_geometry_columns WHERE table_name = 'Wells_SHLpts'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(geometry_type, "POINT");
        assert_eq!(srs_id, GPKG_CUSTOM_SRS_BASE);

        let app_id: i64 = writer.conn.query_row("PRAGMA application_id", [], |row| row.get(0))?;
        assert_eq!(app_id, GPKG_APPLICATION_ID as i64);
        Ok(())
    }

    #[test]
    fn test_second_layer_keeps_first() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("out.gpkg");
        {
            let mut writer = GeoPackageWriter::open(&path)?;
            writer.write_layer("Wells_SHLpts", &point_layer("a", 2))?;
        }

        let mut writer = GeoPackageWriter::open(&path)?;
        let mut roads = Layer::new("roads");
        roads.add_column(Column::text("NAME", 10));
        roads.push_feature(
            Feature::new(Shape::Polyline(Polyline::new(vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 1.0),
            ])))
            .with_attribute("NAME", AttributeValue::Text("FM 1960".into())),
        );
        writer.write_layer("Roads_ln", &roads)?;

        assert_eq!(
            writer.layer_names()?,
            vec!["Roads_ln".to_string(), "Wells_SHLpts".to_string()]
        );
        assert_eq!(writer.feature_count("Wells_SHLpts")?, 2);
        assert_eq!(writer.feature_count("Roads_ln")?, 1);

        // no CRS on the roads layer
        let srs_id: i32 = writer.conn.query_row(
            "SELECT srs_id FROM gpkg_contents WHERE table_name = 'Roads_ln'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(srs_id, GPKG_UNDEFINED_CARTESIAN_SRS);
        Ok(())
    }

    #[test]
    fn test_rewrite_replaces_layer() -> Result<()> {
        let temp = TempDir::new()?;
        let mut writer = GeoPackageWriter::open(&temp.path().join("out.gpkg"))?;

        writer.write_layer("Wells_SHLpts", &point_layer("a", 5))?;
        writer.write_layer("Wells_SHLpts", &point_layer("a", 2))?;

        assert_eq!(writer.layer_names()?.len(), 1);
        assert_eq!(writer.feature_count("Wells_SHLpts")?, 2);
        let srs_rows: i64 = writer.conn.query_row(
            "SELECT COUNT(*) FROM gpkg_spatial_ref_sys WHERE srs_id >= ?1",
            params![GPKG_CUSTOM_SRS_BASE],
            |row| row.get(0),
        )?;
        assert_eq!(srs_rows, 1);
        Ok(())
    }

    #[test]
    fn test_sql_column_names_avoid_clashes() {
        let columns = vec![
            Column::text("FID", 5),
            Column::text("api", 5),
            Column::text("API", 5),
        ];
        assert_eq!(sql_column_names(&columns), vec!["FID_1", "api", "API_1"]);
    }

    #[test]
    fn test_mixed_geometry_is_generic() -> Result<()> {
        let geometries = vec![
            wkb::encode_shape(&Shape::Point(Point::new(0.0, 0.0)), false)?,
            wkb::encode_shape(
                &Shape::Polyline(Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)])),
                false,
            )?,
        ];
        assert_eq!(geometry_type_name(&geometries), "GEOMETRY");
        assert_eq!(geometry_type_name(&geometries[..1]), "POINT");
        Ok(())
    }
}
