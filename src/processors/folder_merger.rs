use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{DiagnosticKind, Stage, StageReport};
use crate::processors::layer_concat::LayerConcatenator;
use crate::utils::constants::GEOMETRY_EXTENSION;
use crate::utils::fs::{list_files_with_extension, walk_sorted};
use crate::utils::{merge_output_file_name, ProgressReporter};
use crate::writers::ShapefileWriter;
use std::fs;
use std::path::{Path, PathBuf};

/// Merges the shapefiles of each directory into `<dir>/MergedFiles/<parent>-<dir>_Merge.shp`.
pub struct FolderMerger {
    merged_folder_name: String,
    concatenator: LayerConcatenator,
    writer: ShapefileWriter,
}

impl FolderMerger {
    pub fn new() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            merged_folder_name: config.merged_folder_name.clone(),
            concatenator: LayerConcatenator::from_config(config),
            writer: ShapefileWriter::new(),
        }
    }

    pub fn merge_tree(&self, root: &Path, progress: Option<&ProgressReporter>) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Merge);

        // gather first: the merge writes new directories into the tree
        let dirs: Vec<PathBuf> = walk_sorted(root, Some(self.merged_folder_name.as_str()))?
            .into_iter()
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();

        for dir in &dirs {
            if let Some(p) = progress {
                p.set_message(&format!("Merging {}", dir.display()));
            }
            match self.merge_directory(dir, &mut report) {
                Ok(Some(output)) => {
                    tracing::info!("Merged {} into {}", dir.display(), output.display());
                    report.record_success();
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Merge of {} failed: {}", dir.display(), e);
                    report.record(DiagnosticKind::IoFailure, dir, e.to_string());
                }
            }
        }

        Ok(report)
    }

    /// Merge one directory. `Ok(None)` when it holds no shapefiles or none could be read.
    pub fn merge_directory(&self, dir: &Path, report: &mut StageReport) -> Result<Option<PathBuf>> {
        let inputs = list_files_with_extension(dir, GEOMETRY_EXTENSION)?;
        if inputs.is_empty() {
            return Ok(None);
        }

        let output_name = merge_output_file_name(dir);
        let stem = output_name.trim_end_matches(GEOMETRY_EXTENSION);
        let Some(merged) = self.concatenator.concatenate(stem, &inputs, report) else {
            return Ok(None);
        };

        let output_dir = dir.join(&self.merged_folder_name);
        fs::create_dir_all(&output_dir)?;
        let output = output_dir.join(&output_name);
        let written = self.writer.write_replacing(&merged, &output)?;
        tracing::debug!("{} features from {} files", written, inputs.len());

        Ok(Some(output))
    }
}

impl Default for FolderMerger {
    fn default() -> Self {
        Self::new()
    }
}
