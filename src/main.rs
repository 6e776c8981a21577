use anyhow::Context;
use clap::Parser;
use shapefile_organizer::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let report = run(cli).context("Shapefile organizer run failed")?;

    if report.total_diagnostics() > 0 {
        println!(
            "Finished with {} diagnostics; see the summary above",
            report.total_diagnostics()
        );
    }
    Ok(())
}
