use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("dBase error: {0}")]
    Dbase(#[from] shapefile::dbase::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("GeoPackage write error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid root directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Column '{column}' not found in {file}")]
    MissingColumn { column: String, file: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),
}
