use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::well_status::{max_label_width, status_label_for_value};
use crate::models::{AttributeValue, Column, ColumnKind, Layer};

/// Decodes the numeric well status code into a readable label column.
pub struct StatusDecorator {
    code_field: String,
    label_column: String,
}

impl StatusDecorator {
    pub fn new() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            code_field: config.status_code_field.clone(),
            label_column: config.status_label_column.clone(),
        }
    }

    /// Return a copy of `layer` with the label column added (or replaced).
    ///
    /// The code column is found by trimmed, case-insensitive name and must be
    /// numeric. Codes outside the status table, and null codes, get a null label.
    pub fn decorate(&self, layer: &Layer) -> Result<Layer> {
        let column = layer
            .find_column_ignore_case(&self.code_field)
            .ok_or_else(|| ProcessingError::MissingColumn {
                column: self.code_field.clone(),
                file: layer.name.clone(),
            })?;
        if column.kind != ColumnKind::Number {
            return Err(ProcessingError::InvalidFormat(format!(
                "{}: column '{}' is not numeric",
                layer.name, column.name
            )));
        }
        let code_column = column.name.clone();

        let labels: Vec<AttributeValue> = layer
            .features()
            .iter()
            .map(|feature| {
                feature
                    .get(&code_column)
                    .as_f64()
                    .and_then(status_label_for_value)
                    .map(|label| AttributeValue::Text(label.to_string()))
                    .unwrap_or_default()
            })
            .collect();

        let mut decorated = layer.clone();
        decorated.set_column(Column::text(&self.label_column, max_label_width()), labels);
        Ok(decorated)
    }
}

impl Default for StatusDecorator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Feature;
    use pretty_assertions::assert_eq;
    use shapefile::{Point, Shape};

    fn layer_with_codes(codes: &[Option<f64>]) -> Layer {
        let mut layer = Layer::new("well001_s");
        layer.add_column(Column::number("SYMNUM", 4, 0));
        for code in codes {
            let value = code.map(AttributeValue::Number).unwrap_or_default();
            layer.push_feature(Feature::new(Shape::Point(Point::new(0.0, 0.0))).with_attribute("SYMNUM", value));
        }
        layer
    }

    #[test]
    fn test_decorate_maps_codes() -> Result<()> {
        let layer = layer_with_codes(&[Some(4.0), Some(155.0), Some(1.0), None]);

        let decorated = StatusDecorator::new().decorate(&layer)?;

        let labels: Vec<&AttributeValue> = decorated
            .features()
            .iter()
            .map(|f| f.get("Well_Status"))
            .collect();
        assert_eq!(
            labels,
            vec![
                &AttributeValue::Text("Oil Well".into()),
                &AttributeValue::Text("Plugged Storage/Brine Mining/Oil/Gas".into()),
                &AttributeValue::Null,
                &AttributeValue::Null,
            ]
        );
        assert_eq!(decorated.column("Well_Status").map(|c| c.kind), Some(ColumnKind::Text));
        // input untouched
        assert!(!layer.has_column("Well_Status"));
        Ok(())
    }

    #[test]
    fn test_decorate_replaces_existing_label_column() -> Result<()> {
        let layer = StatusDecorator::new().decorate(&layer_with_codes(&[Some(4.0)]))?;
        let again = StatusDecorator::new().decorate(&layer)?;

        let count = again.columns().iter().filter(|c| c.name == "Well_Status").count();
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn test_missing_or_textual_code_column() {
        let layer = Layer::new("well002_s");
        assert!(matches!(
            StatusDecorator::new().decorate(&layer),
            Err(ProcessingError::MissingColumn { .. })
        ));

        let mut textual = Layer::new("well003_s");
        textual.add_column(Column::text("SymNum", 4));
        assert!(matches!(
            StatusDecorator::new().decorate(&textual),
            Err(ProcessingError::InvalidFormat(_))
        ));
    }
}
