/// Shapefile family extensions, primary members first
pub const SHAPEFILE_EXTENSIONS: &[&str] = &[".shp", ".shx", ".dbf", ".prj", ".sbn", ".sbx", ".cpg"];

/// Metadata sidecar using a double extension; travels with its family but never defines one
pub const METADATA_SIDECAR_EXTENSION: &str = ".shp.xml";

pub const GEOMETRY_EXTENSION: &str = ".shp";
pub const INDEX_EXTENSION: &str = ".shx";
pub const ATTRIBUTE_EXTENSION: &str = ".dbf";
pub const PROJECTION_EXTENSION: &str = ".prj";
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Filename tokens
pub const WELL_TOKEN: &str = "well";
pub const ATTRIBUTE_TABLE_TOKEN: &str = "api";
pub const LABEL_POINT_MARKER: &str = "Labpt";
pub const ABSTRACT_POINT_MARKER: &str = "Abspt";

/// Classification defaults
pub const DEFAULT_PREFIX_LENGTH: usize = 6;
pub const DEFAULT_KEY_DIGITS: usize = 6;

/// Column names
pub const STATUS_CODE_FIELD: &str = "SymNum";
pub const STATUS_LABEL_COLUMN: &str = "Well_Status";
pub const LAYER_KEY_COLUMN: &str = "API";
pub const TABLE_KEY_COLUMN: &str = "APINUM";
pub const PROVENANCE_COLUMN: &str = "source_file";
pub const JOIN_COLLISION_SUFFIX: &str = "_y";

/// Directory and file names
pub const MERGED_FOLDER_NAME: &str = "MergedFiles";
pub const MERGE_OUTPUT_SUFFIX: &str = "_Merge";
pub const DEFAULT_CONTAINER_NAME: &str = "TRRC_MergedLayers.gpkg";

/// dBase limits
pub const MAX_FIELD_NAME_BYTES: usize = 11;
pub const MAX_CHARACTER_WIDTH: u8 = 254;
pub const DEFAULT_NUMERIC_WIDTH: u8 = 19;
pub const DEFAULT_NUMERIC_DECIMALS: u8 = 8;

/// GeoPackage identifiers
pub const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;
pub const GPKG_USER_VERSION: i32 = 10300;
pub const GPKG_GEOMETRY_COLUMN: &str = "geom";
pub const GPKG_UNDEFINED_CARTESIAN_SRS: i32 = -1;
pub const GPKG_CUSTOM_SRS_BASE: i32 = 100_000;
