pub mod attribute_joiner;
pub mod classifier;
pub mod folder_merger;
pub mod layer_concat;
pub mod layer_consolidator;
pub mod pipeline;
pub mod status_decorator;
pub mod well_enricher;

pub use attribute_joiner::AttributeJoiner;
pub use classifier::{Destination, FamilyClassifier, Unclassified};
pub use folder_merger::FolderMerger;
pub use layer_concat::LayerConcatenator;
pub use layer_consolidator::LayerConsolidator;
pub use pipeline::Pipeline;
pub use status_decorator::StatusDecorator;
pub use well_enricher::{AttributeTableIndex, WellEnricher};
