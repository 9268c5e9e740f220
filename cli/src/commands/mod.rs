//! Command implementations for the `campus` CLI.

pub mod completions;
pub mod files;
pub mod upload;

pub use completions::generate_completions;
pub use files::run_files;
pub use upload::{UploadOutcome, run_upload};
