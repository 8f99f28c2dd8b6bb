//! Google Cloud Storage backend (JSON API)

use super::ObjectStore;
use crate::error::{Error, Result, StorageError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Metadata server endpoint for the default service account token
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh cached tokens this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Timeout for individual storage requests
const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Object store speaking the GCS JSON API
///
/// Authenticates with a static bearer token when one is configured, otherwise
/// with the instance service account from the metadata server.
pub struct GcsObjectStore {
    client: reqwest::Client,
    endpoint: String,
    project: Option<String>,
    static_token: Option<String>,
    metadata_url: String,
    cached_token: Mutex<Option<(String, Instant)>>,
}

impl GcsObjectStore {
    /// Create a store talking to `endpoint` (normally `https://storage.googleapis.com`)
    pub fn new(
        endpoint: impl Into<String>,
        project: Option<String>,
        static_token: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project,
            static_token,
            metadata_url: METADATA_TOKEN_URL.to_string(),
            cached_token: Mutex::new(None),
        })
    }

    /// Use a different token endpoint
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        let mut cached = self.cached_token.lock().await;
        if let Some((token, expires)) = cached.as_ref()
            && Instant::now() + TOKEN_REFRESH_MARGIN < *expires
        {
            return Ok(token.clone());
        }

        let response = self
            .client
            .get(&self.metadata_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "metadata server refused token request: {}",
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await?;
        let expires = Instant::now() + Duration::from_secs(body.expires_in);
        *cached = Some((body.access_token.clone(), expires));
        Ok(body.access_token)
    }

    async fn request(&self, method: reqwest::Method, url: String) -> Result<reqwest::RequestBuilder> {
        let mut builder = self
            .client
            .request(method, url)
            .bearer_auth(self.token().await?);
        if let Some(project) = &self.project {
            builder = builder.header("x-goog-user-project", project);
        }
        Ok(builder)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        )
    }
}

fn uri(bucket: &str, key: &str) -> String {
    format!("gs://{}/{}", bucket, key)
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    fn scheme(&self) -> &'static str {
        "gs"
    }

    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let fail = |reason: String| StorageError::UploadFailed {
            path: path.to_path_buf(),
            uri: uri(bucket, key),
            reason,
        };

        let (body, len) = crate::streaming::file_body(path)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.endpoint,
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        );

        let response = self
            .request(reqwest::Method::POST, url)
            .await?
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(reqwest::header::CONTENT_LENGTH, len)
            .body(body)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(fail(format!("HTTP {}: {}", status, text.trim())).into());
        }
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let fail = |reason: String| StorageError::DownloadFailed {
            uri: uri(bucket, key),
            reason,
        };

        let url = format!("{}?alt=media", self.object_url(bucket, key));
        let response = self
            .request(reqwest::Method::GET, url)
            .await?
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        match response.status() {
            s if s.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => {
                return Err(StorageError::NotFound {
                    uri: uri(bucket, key),
                }
                .into());
            }
            s => return Err(fail(format!("HTTP {}", s)).into()),
        }

        let bytes = crate::streaming::write_body(response, dest)
            .await
            .map_err(fail)?;
        tracing::debug!(uri = %uri(bucket, key), bytes, "downloaded object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, self.object_url(bucket, key))
            .await?
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed {
                uri: uri(bucket, key),
                reason: e.to_string(),
            })?;

        match response.status() {
            s if s.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound {
                uri: uri(bucket, key),
            }
            .into()),
            s => Err(StorageError::DeleteFailed {
                uri: uri(bucket, key),
                reason: format!("HTTP {}", s),
            }
            .into()),
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let response = self
            .request(reqwest::Method::GET, self.object_url(bucket, key))
            .await?
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => Err(Error::Other(format!(
                "unexpected status {} checking {}",
                s,
                uri(bucket, key)
            ))),
        }
    }
}
