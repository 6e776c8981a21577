use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{DiagnosticKind, Stage, StageReport};
use crate::processors::layer_concat::LayerConcatenator;
use crate::utils::constants::GEOMETRY_EXTENSION;
use crate::utils::fs::{list_files_with_extension, walk_sorted};
use crate::utils::{layer_name, ProgressReporter};
use crate::writers::GeoPackageWriter;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Collects every merge-output folder in the tree into one GeoPackage, one layer
/// per folder.
pub struct LayerConsolidator {
    merged_folder_name: String,
    container_name: String,
    concatenator: LayerConcatenator,
}

impl LayerConsolidator {
    pub fn new() -> Self {
        Self::from_config(&PipelineConfig::default())
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            merged_folder_name: config.merged_folder_name.clone(),
            container_name: config.container_name.clone(),
            concatenator: LayerConcatenator::from_config(config),
        }
    }

    pub fn container_path(&self, root: &Path) -> PathBuf {
        root.join(&self.container_name)
    }

    /// Directories anywhere under `root` named like the merge-output folder.
    pub fn find_merged_folders(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let folders = walk_sorted(root, None)?
            .into_iter()
            .filter(|e| {
                e.depth() > 0
                    && e.file_type().is_dir()
                    && e
                        .file_name()
                        .to_string_lossy()
                        .eq_ignore_ascii_case(&self.merged_folder_name)
            })
            .map(|e| e.into_path())
            .collect();
        Ok(folders)
    }

    pub fn consolidate(&self, root: &Path, progress: Option<&ProgressReporter>) -> Result<StageReport> {
        self.consolidate_into(root, &self.container_path(root), progress)
    }

    /// Write one layer per merge-output folder into `container`. The container is
    /// opened on the first layer, so a tree without merged folders leaves no file.
    pub fn consolidate_into(
        &self,
        root: &Path,
        container: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Consolidate);
        let mut writer: Option<GeoPackageWriter> = None;
        let mut used_names: HashSet<String> = HashSet::new();

        for folder in self.find_merged_folders(root)? {
            let inputs = match list_files_with_extension(&folder, GEOMETRY_EXTENSION) {
                Ok(inputs) => inputs,
                Err(e) => {
                    report.record(DiagnosticKind::IoFailure, &folder, e.to_string());
                    continue;
                }
            };
            if inputs.is_empty() {
                tracing::warn!("No shapefiles in {}", folder.display());
                report.record(DiagnosticKind::EmptyFolder, &folder, "no shapefiles to consolidate");
                continue;
            }

            let name = unique_name(layer_name(root, &folder), &mut used_names);
            let Some(layer) = self.concatenator.concatenate(&name, &inputs, &mut report) else {
                continue;
            };

            if writer.is_none() {
                match GeoPackageWriter::open(container) {
                    Ok(opened) => writer = Some(opened),
                    Err(e) => {
                        tracing::warn!("Cannot open {}: {}", container.display(), e);
                        report.record(DiagnosticKind::IoFailure, container, e.to_string());
                        break;
                    }
                }
            }
            let Some(gpkg) = writer.as_mut() else {
                break;
            };

            match gpkg.write_layer(&name, &layer) {
                Ok(features) => {
                    report.record_success();
                    tracing::info!(
                        "Layer '{}' written ({} features), {} layers so far",
                        name,
                        features,
                        report.processed
                    );
                    if let Some(p) = progress {
                        p.set_message(&format!("{} layers written", report.processed));
                    }
                }
                Err(e) => {
                    tracing::warn!("Cannot write layer '{}': {}", name, e);
                    report.record(DiagnosticKind::IoFailure, &folder, e.to_string());
                }
            }
        }

        Ok(report)
    }
}

impl Default for LayerConsolidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct folders can map to the same name (`a-b` and `a_b`); later ones get a
/// numeric suffix.
fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut counter = 2;
    while used.contains(&candidate.to_lowercase()) {
        candidate = format!("{}_{}", name, counter);
        counter += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}
