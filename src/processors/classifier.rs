use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::rules::{category_for_prefix, subtype_for};
use crate::models::{DiagnosticKind, ShapefileFamily, Stage, StageReport};
use crate::utils::fs::{list_file_names, relocate_files};
use crate::utils::{prefix_token, suffix_token, ProgressReporter};
use std::fs;
use std::path::{Path, PathBuf};

/// `Category/Subtype` folder a family belongs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub category: &'static str,
    pub subtype: &'static str,
}

impl Destination {
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.category).join(self.subtype)
    }
}

/// Why a family could not be given a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unclassified {
    pub kind: DiagnosticKind,
    pub reason: String,
}

/// Sorts loose shapefile families into `Category/Subtype` folders.
pub struct FamilyClassifier {
    prefix_length: usize,
}

impl FamilyClassifier {
    pub fn new() -> Self {
        Self {
            prefix_length: PipelineConfig::default().prefix_length,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            prefix_length: config.prefix_length,
        }
    }

    /// Resolve the destination for a base name from its prefix and suffix tokens.
    pub fn destination(&self, base_name: &str) -> std::result::Result<Destination, Unclassified> {
        let prefix = prefix_token(base_name, self.prefix_length);
        let category = category_for_prefix(&prefix).ok_or_else(|| Unclassified {
            kind: DiagnosticKind::UnknownPrefix,
            reason: format!("no category for prefix '{}'", prefix),
        })?;

        let suffix = suffix_token(base_name).unwrap_or_default();
        let subtype = subtype_for(&prefix, &suffix).ok_or_else(|| Unclassified {
            kind: DiagnosticKind::UnresolvedSuffix,
            reason: format!("no subtype for suffix '{}' under prefix '{}'", suffix, prefix),
        })?;

        Ok(Destination { category, subtype })
    }

    /// Classify every family of loose files directly inside `dir`. Problems with one
    /// family are recorded and never stop the others.
    pub fn classify_dir(&self, dir: &Path, progress: Option<&ProgressReporter>) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Classify);
        let names = list_file_names(dir)?;
        let families = ShapefileFamily::group(names.iter().map(String::as_str));

        for family in &families {
            if let Some(p) = progress {
                p.set_message(&format!("Classifying {}", family.base_name));
            }
            self.classify_family(dir, family, &mut report);
        }

        Ok(report)
    }

    fn classify_family(&self, dir: &Path, family: &ShapefileFamily, report: &mut StageReport) {
        let destination = match self.destination(&family.base_name) {
            Ok(destination) => destination,
            Err(miss) => {
                tracing::warn!("Skipping {}: {}", family.base_name, miss.reason);
                report.record(miss.kind, &family.base_name, miss.reason);
                return;
            }
        };

        let dest_dir = destination.path_in(dir);
        if let Err(e) = fs::create_dir_all(&dest_dir) {
            tracing::warn!("Cannot create {}: {}", dest_dir.display(), e);
            report.record(
                DiagnosticKind::IoFailure,
                &family.base_name,
                format!("cannot create {}: {}", dest_dir.display(), e),
            );
            return;
        }

        let file_names: Vec<&str> = family.file_names().collect();
        match relocate_files(dir, &dest_dir, &file_names) {
            Ok(moved) => {
                tracing::info!(
                    "Moved {} ({} files) to {}/{}",
                    family.base_name,
                    moved.len(),
                    destination.category,
                    destination.subtype
                );
                report.record_success();
            }
            Err(e) => {
                tracing::warn!("Could not move {}: {}", family.base_name, e);
                report.record(DiagnosticKind::IoFailure, &family.base_name, e.to_string());
            }
        }
    }
}

impl Default for FamilyClassifier {
    fn default() -> Self {
        Self::new()
    }
}
