use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Expand,
    Classify,
    Enrich,
    Merge,
    Consolidate,
}

impl Stage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Expand => "Archive expansion",
            Stage::Classify => "Classification",
            Stage::Enrich => "Well enrichment",
            Stage::Merge => "Folder merge",
            Stage::Consolidate => "Layer consolidation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Non-fatal problem categories; none of them stop the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    UnknownPrefix,
    UnresolvedSuffix,
    SchemaMismatch,
    JoinKeyMiss,
    IoFailure,
    EmptyFolder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}: {}", self.kind, self.subject, self.message)
    }
}

/// Outcome of one stage over the whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub processed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            processed: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record(&mut self, kind: DiagnosticKind, subject: impl AsRef<Path>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            kind,
            subject: subject.as_ref().display().to_string(),
            message: message.into(),
        });
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}: {} processed, {} diagnostics",
            self.stage,
            self.processed,
            self.diagnostics.len()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub root: String,
    pub container: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn start(root: &Path) -> Self {
        Self {
            root: root.display().to_string(),
            container: None,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn total_diagnostics(&self) -> usize {
        self.stages.iter().map(|s| s.diagnostics.len()).sum()
    }

    /// Generate a summary report
    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Run Summary ===\n");
        summary.push_str(&format!("Root: {}\n", self.root));
        if let Some(container) = &self.container {
            summary.push_str(&format!("Container: {}\n", container));
        }
        if let Some(finished) = self.finished_at {
            let elapsed = finished - self.started_at;
            summary.push_str(&format!(
                "Elapsed: {:.1}s\n",
                elapsed.num_milliseconds() as f64 / 1000.0
            ));
        }
        for stage in &self.stages {
            summary.push_str(&format!("  {}\n", stage.summary_line()));
        }

        let total = self.total_diagnostics();
        summary.push_str(&format!("\nDiagnostics: {}\n", total));
        if total > 0 {
            summary.push_str("\nFirst 10 Diagnostics:\n");
            for (i, diagnostic) in self
                .stages
                .iter()
                .flat_map(|s| s.diagnostics.iter())
                .take(10)
                .enumerate()
            {
                summary.push_str(&format!("  {}. {}\n", i + 1, diagnostic));
            }
        }

        summary
    }
}
