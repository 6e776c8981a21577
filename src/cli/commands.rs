use crate::cli::args::Cli;
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::RunReport;
use crate::processors::Pipeline;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;

pub fn run(cli: Cli) -> Result<RunReport> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if cli.skip_extract {
        config.expand_archives = false;
    }

    let root = match cli.root {
        Some(root) => root,
        None => prompt_for_root(&mut io::stdin().lock(), &mut io::stdout())?,
    };

    println!("Processing dataset root: {}", root.display());
    let pipeline = Pipeline::new(config).with_quiet(cli.quiet);
    let report = pipeline.run(&root)?;

    println!("\n{}", report.generate_summary());

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        println!("Run report written to {}", path.display());
    }

    Ok(report)
}

/// Ask for the dataset root on `input`, echoing the prompt to `output`.
pub fn prompt_for_root<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<PathBuf> {
    write!(output, "Enter the dataset root directory: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let trimmed = line.trim().trim_matches('"');
    if trimmed.is_empty() {
        return Err(ProcessingError::InvalidRoot(PathBuf::new()));
    }
    Ok(PathBuf::from(trimmed))
}

pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| ProcessingError::InvalidFormat(format!("Cannot serialise run report: {}", e)))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Install the global subscriber. Returns false when one was already installed
/// (tests, embedding), in which case that subscriber keeps receiving events.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<bool> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    match installed {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::debug!("Keeping the existing log subscriber: {}", e);
            Ok(false)
        }
    }
}
