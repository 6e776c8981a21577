use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{Column, Feature, Layer};
use crate::readers::AttributeTable;
use crate::utils::constants::JOIN_COLLISION_SUFFIX;
use std::collections::HashMap;

/// Left-outer join of a layer with an external attribute table.
pub struct AttributeJoiner {
    layer_key: String,
    table_key: String,
}

impl AttributeJoiner {
    pub fn new() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            layer_key: config.layer_key_column.clone(),
            table_key: config.table_key_column.clone(),
        }
    }

    /// Join `table` onto `layer`, matching the table's key column against the layer's.
    ///
    /// Every layer feature appears once per matching table row, or once with null
    /// table columns when nothing matches. Keys compare by their normalised text;
    /// nulls never match. Table columns whose names are already on the layer get a
    /// `_y` suffix.
    pub fn join(&self, layer: &Layer, table: &AttributeTable) -> Result<Layer> {
        if !table.has_column(&self.table_key) {
            return Err(ProcessingError::MissingColumn {
                column: self.table_key.clone(),
                file: "attribute table".to_string(),
            });
        }
        if !layer.has_column(&self.layer_key) {
            return Err(ProcessingError::MissingColumn {
                column: self.layer_key.clone(),
                file: layer.name.clone(),
            });
        }

        // (table column, output column) for every non-key column
        let mut taken: Vec<String> = layer.columns().iter().map(|c| c.name.clone()).collect();
        let mut added: Vec<(Column, String)> = Vec::new();
        for column in table.columns.iter().filter(|c| c.name != self.table_key) {
            let mut output = column.name.clone();
            while taken.contains(&output) {
                output.push_str(JOIN_COLLISION_SUFFIX);
            }
            taken.push(output.clone());
            added.push((column.clone(), output));
        }

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            if let Some(key) = row.get(&self.table_key).and_then(|v| v.join_key()) {
                index.entry(key).or_default().push(i);
            }
        }

        let mut columns = layer.columns().to_vec();
        for (column, output) in &added {
            let mut renamed = column.clone();
            renamed.name = output.clone();
            columns.push(renamed);
        }

        let mut features = Vec::with_capacity(layer.len());
        let mut matched = 0;
        for feature in layer.features() {
            let rows = feature
                .get(&self.layer_key)
                .join_key()
                .and_then(|key| index.get(&key));
            match rows {
                Some(rows) => {
                    matched += 1;
                    for &i in rows {
                        let mut joined: Feature = feature.clone();
                        for (column, output) in &added {
                            if let Some(value) = table.rows[i].get(&column.name) {
                                joined.set(output.clone(), value.clone());
                            }
                        }
                        features.push(joined);
                    }
                }
                None => features.push(feature.clone()),
            }
        }

        tracing::debug!(
            "{}: {} of {} features matched the attribute table",
            layer.name,
            matched,
            layer.len()
        );

        Ok(Layer::from_parts(
            layer.name.clone(),
            layer.crs.clone(),
            columns,
            features,
        )
        .with_code_page(layer.code_page))
    }
}

impl Default for AttributeJoiner {
    fn default() -> Self {
        Self::new()
    }
}
