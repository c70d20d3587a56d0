//! Wire types for the generative-model file API.
//!
//! The backend speaks camelCase JSON. Only the fields this pipeline reads
//! are modeled; everything else in the replies is ignored.

use serde::{Deserialize, Serialize};

/// Connection settings for the analysis backend.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// API key for the generative language service.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Model to use.
    pub model: String,

    /// Max concurrent analysis round-trips across all file tasks.
    pub max_concurrent_requests: usize,
}

impl AnalysisConfig {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model,
            max_concurrent_requests: 4,
        }
    }
}

/// Processing state of an uploaded remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[default]
    StateUnspecified,
    Processing,
    Active,
    Failed,
    /// Any state string this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// Handle to a file in the remote blob store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc-123`.
    pub name: String,

    /// URI referenced from generation requests.
    pub uri: String,

    #[serde(default)]
    pub state: FileState,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub file: RemoteFile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileData {
    pub file_uri: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_mime_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Content,
}
