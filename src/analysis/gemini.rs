//! Gemini REST client

use super::service::{AnalysisService, RemoteFile};
use crate::error::{AnalysisError, Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Timeout for upload, status and delete requests
const FILE_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Gemini Files and `generateContent` APIs
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model` at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let model = model.into();
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.trim_start_matches("models/").to_string(),
        })
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, name)
    }
}

async fn error_text(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("HTTP {}: {}", status, body.trim())
}

#[async_trait]
impl AnalysisService for GeminiClient {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile> {
        let fail = |reason: String| AnalysisError::UploadFailed { reason };

        let (body, len) = crate::streaming::file_body(path)
            .await
            .map_err(|e| fail(format!("cannot read {}: {}", path.display(), e)))?;

        let response = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .query(&[("uploadType", "media")])
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .header(reqwest::header::CONTENT_LENGTH, len)
            .timeout(Duration::from_secs(FILE_REQUEST_TIMEOUT_SECS))
            .body(body)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fail(error_text(response).await).into());
        }

        let body: UploadResponse = response.json().await.map_err(|e| fail(e.to_string()))?;
        Ok(body.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let response = self
            .client
            .get(self.file_url(name))
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(FILE_REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Other(error_text(response).await));
        }
        Ok(response.json().await?)
    }

    async fn generate(&self, prompt: &str, file: &RemoteFile, timeout: Duration) -> Result<String> {
        let fail = |reason: String| AnalysisError::ModelFailed { reason };

        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "file_data": { "mime_type": file.mime_type, "file_uri": file.uri } }
                ]
            }]
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    fail(format!("no answer within {}s", timeout.as_secs()))
                } else {
                    fail(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(fail(error_text(response).await).into());
        }

        let answer: GenerateResponse = response.json().await.map_err(|e| fail(e.to_string()))?;
        let content = answer
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| fail("the model returned no candidate content".to_string()))?;

        Ok(content.parts.into_iter().filter_map(|p| p.text).collect())
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.file_url(name))
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(FILE_REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Other(error_text(response).await));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
