pub mod geopackage_writer;
pub mod shapefile_writer;
pub mod wkb;

pub use geopackage_writer::GeoPackageWriter;
pub use shapefile_writer::{write_table, ShapefileWriter};
