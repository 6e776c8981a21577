use crate::error::{ProcessingError, Result};
use crate::models::{Feature, Layer};
use crate::readers::attribute_table::{AttributeTable, AttributeTableReader};
use crate::utils::constants::{ATTRIBUTE_EXTENSION, PROJECTION_EXTENSION};
use crate::utils::fs::find_sibling;
use std::fs;
use std::path::Path;

/// Loads a shapefile family (geometry, attributes, projection) into a [`Layer`].
pub struct LayerReader {
    table_reader: AttributeTableReader,
}

impl LayerReader {
    pub fn new() -> Self {
        Self {
            table_reader: AttributeTableReader::new(),
        }
    }

    pub fn read(&self, shp_path: &Path) -> Result<Layer> {
        let shapes = shapefile::read_shapes(shp_path)?;

        let table = match find_sibling(shp_path, ATTRIBUTE_EXTENSION) {
            Some(dbf_path) => self.table_reader.read(&dbf_path)?,
            None => AttributeTable::default(),
        };

        if !table.rows.is_empty() && table.rows.len() != shapes.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "{}: {} shapes but {} attribute records",
                shp_path.display(),
                shapes.len(),
                table.rows.len()
            )));
        }

        let crs = self.read_projection(shp_path)?;
        let name = shp_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut rows = table.rows.into_iter();
        let features = shapes
            .into_iter()
            .map(|shape| Feature {
                shape,
                attributes: rows.next().unwrap_or_default(),
            })
            .collect();

        Ok(Layer::from_parts(name, crs, table.columns, features).with_code_page(table.code_page))
    }

    /// WKT text of the `.prj` sidecar, if present
    fn read_projection(&self, shp_path: &Path) -> Result<Option<String>> {
        match find_sibling(shp_path, PROJECTION_EXTENSION) {
            Some(prj_path) => {
                let wkt = fs::read_to_string(prj_path)?;
                let trimmed = wkt.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            None => Ok(None),
        }
    }
}

impl Default for LayerReader {
    fn default() -> Self {
        Self::new()
    }
}
