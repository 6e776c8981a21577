use crate::error::Result;
use crate::models::{DiagnosticKind, Stage, StageReport};
use crate::utils::constants::ARCHIVE_EXTENSION;
use crate::utils::filename::has_extension_ignore_case;
use crate::utils::fs::walk_sorted;
use crate::utils::ProgressReporter;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Expands every `.zip` under a root into the directory that holds it.
pub struct ArchiveExpander {
    overwrite: bool,
}

impl ArchiveExpander {
    pub fn new() -> Self {
        Self { overwrite: true }
    }

    /// Keep files that already exist instead of replacing them on re-runs.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// All archives in the tree, collected before anything is extracted so that
    /// archives unpacked by this run are not visited again.
    pub fn find_archives(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let archives = walk_sorted(root, None)?
            .into_iter()
            .filter(|entry| {
                entry.file_type().is_file()
                    && has_extension_ignore_case(&entry.file_name().to_string_lossy(), ARCHIVE_EXTENSION)
            })
            .map(|entry| entry.into_path())
            .collect();
        Ok(archives)
    }

    pub fn expand_all(&self, root: &Path, progress: Option<&ProgressReporter>) -> Result<StageReport> {
        let mut report = StageReport::new(Stage::Expand);

        for archive in self.find_archives(root)? {
            if let Some(p) = progress {
                p.set_message(&format!("Expanding {}", archive.display()));
            }
            match self.extract(&archive) {
                Ok(files) => {
                    tracing::info!("Expanded {} ({} files)", archive.display(), files.len());
                    report.record_success();
                }
                Err(e) => {
                    tracing::warn!("Could not expand {}: {}", archive.display(), e);
                    report.record(DiagnosticKind::IoFailure, &archive, e.to_string());
                }
            }
        }

        Ok(report)
    }

    /// Extract one archive next to itself. Entries whose names would escape the
    /// target directory are skipped.
    pub fn extract(&self, zip_path: &Path) -> Result<Vec<PathBuf>> {
        let target_dir = zip_path.parent().unwrap_or_else(|| Path::new("."));
        let file = File::open(zip_path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut extracted = Vec::new();

        for i in 0..archive.len() {
            let mut zip_file = archive.by_index(i)?;
            let Some(relative) = zip_file.enclosed_name().map(Path::to_path_buf) else {
                tracing::warn!(
                    "Skipping unsafe entry '{}' in {}",
                    zip_file.name(),
                    zip_path.display()
                );
                continue;
            };
            let dest_path = target_dir.join(relative);

            if zip_file.is_dir() {
                fs::create_dir_all(&dest_path)?;
                continue;
            }
            if !self.overwrite && dest_path.exists() {
                continue;
            }
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut dest_file = File::create(&dest_path)?;
            let mut writer = BufWriter::new(&mut dest_file);
            std::io::copy(&mut zip_file, &mut writer)?;
            writer.flush()?;

            extracted.push(dest_path);
        }

        Ok(extracted)
    }
}

impl Default for ArchiveExpander {
    fn default() -> Self {
        Self::new()
    }
}
