use crate::error::{ProcessingError, Result};
use crate::utils::constants::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Names and tokens the pipeline works with. Defaults match a standard dataset drop;
/// a file may override any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// Expand `.zip` archives before classification
    pub expand_archives: bool,

    #[validate(length(min = 1))]
    pub container_name: String,

    #[validate(length(min = 1))]
    pub merged_folder_name: String,

    #[validate(length(min = 1, max = 11))]
    pub provenance_column: String,

    #[validate(length(min = 1))]
    pub status_code_field: String,

    #[validate(length(min = 1, max = 11))]
    pub status_label_column: String,

    #[validate(length(min = 1))]
    pub well_token: String,

    #[validate(length(min = 1))]
    pub table_token: String,

    #[validate(length(min = 1, max = 11))]
    pub layer_key_column: String,

    #[validate(length(min = 1, max = 11))]
    pub table_key_column: String,

    #[validate(range(min = 1, max = 32))]
    pub key_digits: usize,

    #[validate(range(min = 1, max = 32))]
    pub prefix_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expand_archives: true,
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            merged_folder_name: MERGED_FOLDER_NAME.to_string(),
            provenance_column: PROVENANCE_COLUMN.to_string(),
            status_code_field: STATUS_CODE_FIELD.to_string(),
            status_label_column: STATUS_LABEL_COLUMN.to_string(),
            well_token: WELL_TOKEN.to_string(),
            table_token: ATTRIBUTE_TABLE_TOKEN.to_string(),
            layer_key_column: LAYER_KEY_COLUMN.to_string(),
            table_key_column: TABLE_KEY_COLUMN.to_string(),
            key_digits: DEFAULT_KEY_DIGITS,
            prefix_length: DEFAULT_PREFIX_LENGTH,
        }
    }
}

impl PipelineConfig {
    /// Load overrides from a TOML/JSON/YAML file; unspecified keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ProcessingError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        let parsed: PipelineConfig = settings.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}
