use crate::archive::ArchiveExpander;
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{DiagnosticKind, RunReport, Stage, StageReport};
use crate::processors::{FamilyClassifier, FolderMerger, LayerConsolidator, WellEnricher};
use crate::utils::ProgressReporter;
use std::path::{Path, PathBuf};

/// Runs the stages in order over one dataset root: expand, classify, enrich,
/// merge, consolidate. Each stage finishes before the next one starts.
pub struct Pipeline {
    config: PipelineConfig,
    quiet: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            quiet: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// The root must be an existing directory; this is the only fatal check.
    pub fn validate_root(root: &Path) -> Result<PathBuf> {
        if !root.is_dir() {
            return Err(ProcessingError::InvalidRoot(root.to_path_buf()));
        }
        Ok(root.canonicalize()?)
    }

    pub fn run(&self, root: &Path) -> Result<RunReport> {
        let root = Self::validate_root(root)?;
        let mut run = RunReport::start(&root);
        tracing::info!("Processing {}", root.display());

        if self.config.expand_archives {
            let expander = ArchiveExpander::new();
            run.push(self.stage(Stage::Expand, &root, |p| expander.expand_all(&root, Some(p))));
        }

        let classifier = FamilyClassifier::from_config(&self.config);
        run.push(self.stage(Stage::Classify, &root, |p| classifier.classify_dir(&root, Some(p))));

        let enricher = WellEnricher::from_config(&self.config);
        run.push(self.stage(Stage::Enrich, &root, |p| enricher.enrich_tree(&root, Some(p))));

        let merger = FolderMerger::from_config(&self.config);
        run.push(self.stage(Stage::Merge, &root, |p| merger.merge_tree(&root, Some(p))));

        let consolidator = LayerConsolidator::from_config(&self.config);
        let container = consolidator.container_path(&root);
        let consolidated = self.stage(Stage::Consolidate, &root, |p| consolidator.consolidate(&root, Some(p)));
        if container.exists() {
            run.container = Some(container.display().to_string());
        }
        run.push(consolidated);

        run.finish();
        Ok(run)
    }

    /// Run one stage under its own spinner. A stage-wide failure (for example an
    /// unreadable tree) becomes a diagnostic so the later stages still run.
    fn stage<F>(&self, stage: Stage, root: &Path, body: F) -> StageReport
    where
        F: FnOnce(&ProgressReporter) -> Result<StageReport>,
    {
        let progress = ProgressReporter::for_stage(stage, self.quiet);
        let report = match body(&progress) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("{} failed: {}", stage, e);
                let mut report = StageReport::new(stage);
                report.record(DiagnosticKind::IoFailure, root, e.to_string());
                report
            }
        };
        progress.finish_with_message(&report.summary_line());
        report
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let result = Pipeline::default().with_quiet(true).run(&missing);
        assert!(matches!(result, Err(ProcessingError::InvalidRoot(_))));
    }

    #[test]
    fn test_empty_root_runs_every_stage() -> Result<()> {
        let temp = TempDir::new()?;
        let run = Pipeline::default().with_quiet(true).run(temp.path())?;

        assert_eq!(run.stages.len(), 5);
        assert_eq!(run.total_diagnostics(), 0);
        assert!(run.container.is_none());
        assert!(run.finished_at.is_some());
        Ok(())
    }

    #[test]
    fn test_expansion_can_be_disabled() -> Result<()> {
        let temp = TempDir::new()?;
        let config = PipelineConfig {
            expand_archives: false,
            ..PipelineConfig::default()
        };
        let run = Pipeline::new(config).with_quiet(true).run(temp.path())?;

        assert!(run.stage(Stage::Expand).is_none());
        assert_eq!(run.stages.len(), 4);
        Ok(())
    }
}
