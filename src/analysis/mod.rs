//! Document analysis against the remote generative model.
//!
//! The model is an opaque collaborator: upload bytes, wait until the store
//! has processed them, request generation, parse the JSON reply. Everything
//! here fails into [`crate::error::PipelineError`] and stays contained in
//! the calling file task.

mod client;
mod response;
pub mod types;

use std::path::Path;

pub use client::GeminiClient;
pub use response::parse_records;

/// File extensions eligible for analysis. Everything else in the watch
/// folder is simply not a target document.
const TARGET_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// Whether a path looks like a scanned document this pipeline should handle.
pub fn is_target_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TARGET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
