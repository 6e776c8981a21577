use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shapefile-organizer")]
#[command(about = "Organize a shapefile dataset drop and consolidate it into a GeoPackage")]
#[command(version)]
pub struct Cli {
    /// Dataset root; prompted for on stdin when omitted
    pub root: Option<PathBuf>,

    #[arg(short, long, help = "Configuration file (TOML, JSON or YAML)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Write a JSON run report to this path")]
    pub report: Option<PathBuf>,

    #[arg(long, help = "Do not expand .zip archives before classifying")]
    pub skip_extract: bool,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Suppress progress spinners")]
    pub quiet: bool,

    #[arg(long, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["shapefile-organizer"]).unwrap();
        assert!(cli.root.is_none());
        assert!(!cli.skip_extract);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "shapefile-organizer",
            "/data/drop",
            "--config",
            "organizer.toml",
            "--report",
            "run.json",
            "--skip-extract",
            "-v",
            "--log-file",
            "run.log",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/data/drop")));
        assert_eq!(cli.config, Some(PathBuf::from("organizer.toml")));
        assert_eq!(cli.report, Some(PathBuf::from("run.json")));
        assert!(cli.skip_extract);
        assert!(cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
    }
}
