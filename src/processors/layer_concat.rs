use crate::config::PipelineConfig;
use crate::models::{AttributeValue, Column, DiagnosticKind, Layer, StageReport};
use crate::readers::LayerReader;
use std::path::PathBuf;

/// Loads a set of shapefiles and stacks them into one layer, tagging every feature
/// with the filename it came from.
pub struct LayerConcatenator {
    provenance_column: String,
    reader: LayerReader,
}

impl LayerConcatenator {
    pub fn new() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            provenance_column: config.provenance_column.clone(),
            reader: LayerReader::new(),
        }
    }

    /// Concatenate `inputs` in the given order. Unreadable inputs are recorded on
    /// `report` and left out; `None` when nothing could be read. The result takes
    /// the CRS of the first input that loaded.
    pub fn concatenate(&self, name: &str, inputs: &[PathBuf], report: &mut StageReport) -> Option<Layer> {
        let mut merged: Option<Layer> = None;

        for input in inputs {
            let mut layer = match self.reader.read(input) {
                Ok(layer) => layer,
                Err(e) => {
                    tracing::warn!("Excluding {} from merge: {}", input.display(), e);
                    report.record(DiagnosticKind::IoFailure, input, e.to_string());
                    continue;
                }
            };

            let origin = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let tags = vec![AttributeValue::Text(origin.clone()); layer.len()];
            layer.set_column(Column::text(&self.provenance_column, origin.len()), tags);

            match merged.as_mut() {
                Some(m) => m.append(layer),
                None => {
                    layer.name = name.to_string();
                    merged = Some(layer);
                }
            }
        }

        merged
    }
}

impl Default for LayerConcatenator {
    fn default() -> Self {
        Self::new()
    }
}
