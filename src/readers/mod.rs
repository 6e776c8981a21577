pub mod attribute_table;
pub mod layer_reader;

pub use attribute_table::{AttributeRow, AttributeTable, AttributeTableReader};
pub use layer_reader::LayerReader;
