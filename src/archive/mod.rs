pub mod expander;

pub use expander::ArchiveExpander;
