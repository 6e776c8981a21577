pub mod constants;
pub mod encoding;
pub mod filename;
pub mod fs;
pub mod progress;

pub use constants::*;
pub use filename::{layer_name, merge_output_file_name, prefix_token, suffix_token};
pub use progress::ProgressReporter;
