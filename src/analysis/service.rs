//! Remote analysis service abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Processing state of an uploaded file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum FileState {
    /// Still being processed; poll again
    Processing,
    /// Ready for generation requests
    Active,
    /// Processing failed
    Failed,
    /// Service did not report a state
    #[default]
    StateUnspecified,
}

impl From<String> for FileState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "PROCESSING" => FileState::Processing,
            "ACTIVE" => FileState::Active,
            "FAILED" => FileState::Failed,
            _ => FileState::StateUnspecified,
        }
    }
}

/// A file uploaded to the analysis service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Opaque handle (e.g. `files/abc123`)
    pub name: String,
    /// URI referenced in generation requests
    #[serde(default)]
    pub uri: String,
    /// MIME type of the uploaded bytes
    #[serde(default)]
    pub mime_type: String,
    /// Processing state
    #[serde(default)]
    pub state: FileState,
}

/// Operations the analysis client needs from the remote service
///
/// [`GeminiClient`](super::GeminiClient) is the production implementation;
/// tests substitute scripted ones.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload a local file
    async fn upload(&self, path: &Path, mime_type: &str) -> crate::Result<RemoteFile>;

    /// Fetch the current state of an uploaded file
    async fn get_file(&self, name: &str) -> crate::Result<RemoteFile>;

    /// Run the model on `prompt` plus `file`, returning the answer text
    async fn generate(
        &self,
        prompt: &str,
        file: &RemoteFile,
        timeout: Duration,
    ) -> crate::Result<String>;

    /// Delete an uploaded file
    async fn delete_file(&self, name: &str) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
