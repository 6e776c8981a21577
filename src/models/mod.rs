pub mod family;
pub mod layer;
pub mod report;
pub mod rules;
pub mod well_status;

pub use family::{FamilyMember, ShapefileFamily};
pub use layer::{AttributeValue, Column, ColumnKind, Feature, Layer};
pub use report::{Diagnostic, DiagnosticKind, RunReport, Stage, StageReport};
pub use well_status::{status_label, WELL_STATUS_CODES};
