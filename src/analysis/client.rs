//! Upload, poll, generate and clean up

use super::result::{ANALYSIS_PROMPT, AnalysisResult, parse_model_response};
use super::service::{AnalysisService, FileState, RemoteFile};
use crate::acquisition::MediaContainer;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Error, Result};
use crate::storage::{StorageAdapter, StoredRef};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// MIME type used when the artifact's extension is not recognised
const DEFAULT_MIME_TYPE: &str = "video/mp4";

/// Runs one artifact through the remote analysis service
#[derive(Clone)]
pub struct AnalysisClient {
    service: Arc<dyn AnalysisService>,
    storage: StorageAdapter,
    scratch_dir: PathBuf,
    poll_interval: Duration,
    max_poll_attempts: u32,
    request_timeout: Duration,
}

impl AnalysisClient {
    /// Create a client; remote references are fetched into `scratch_dir`
    pub fn new(
        service: Arc<dyn AnalysisService>,
        storage: StorageAdapter,
        config: &AnalysisConfig,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            service,
            storage,
            scratch_dir: scratch_dir.into(),
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts,
            request_timeout: config.request_timeout,
        }
    }

    /// Analyze the artifact behind `reference`
    ///
    /// A remote reference is fetched to a scratch file first. The uploaded
    /// handle is deleted after the model call whatever its outcome, and the
    /// scratch file is deleted before returning.
    pub async fn analyze(
        &self,
        reference: &StoredRef,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        match reference {
            StoredRef::Local(path) => self.analyze_local(path, cancel).await,
            StoredRef::Remote(blob) => {
                tokio::fs::create_dir_all(&self.scratch_dir).await?;
                let ext = Path::new(&blob.key)
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                let scratch = ScratchFile::new(
                    self.scratch_dir
                        .join(format!("fetch_{}{}", uuid::Uuid::new_v4(), ext)),
                );

                let result = match self.storage.fetch(reference, scratch.path()).await {
                    Ok(path) => self.analyze_local(&path, cancel).await,
                    Err(e) => Err(e),
                };

                scratch.remove().await;
                result
            }
        }
    }

    async fn analyze_local(&self, path: &Path, cancel: &CancellationToken) -> Result<AnalysisResult> {
        let mime_type = MediaContainer::from_path(path)
            .map(|c| c.mime_type())
            .unwrap_or(DEFAULT_MIME_TYPE);

        tracing::info!(
            path = %path.display(),
            service = self.service.name(),
            "uploading artifact for analysis"
        );

        let uploaded = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled("analysis cancelled during upload".into()));
            }
            result = self.service.upload(path, mime_type) => result.map_err(|e| match e {
                Error::Analysis(AnalysisError::UploadFailed { .. }) => e,
                other => AnalysisError::UploadFailed { reason: other.to_string() }.into(),
            })?,
        };

        tracing::info!(handle = %uploaded.name, "artifact uploaded");

        let outcome = self.process_uploaded(uploaded.clone(), cancel).await;

        if let Err(e) = self.service.delete_file(&uploaded.name).await {
            tracing::warn!(handle = %uploaded.name, error = %e, "failed to delete uploaded file");
        }

        outcome
    }

    async fn process_uploaded(
        &self,
        mut file: RemoteFile,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let handle = file.name.clone();
        let mut polls = 0;

        while file.state == FileState::Processing {
            if polls >= self.max_poll_attempts {
                return Err(AnalysisError::ProcessingFailed {
                    handle,
                    reason: format!("still processing after {} status checks", polls),
                }
                .into());
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled("analysis cancelled while processing".into()));
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            polls += 1;

            file = self.service.get_file(&handle).await.map_err(|e| {
                AnalysisError::ProcessingFailed {
                    handle: handle.clone(),
                    reason: e.to_string(),
                }
            })?;
            tracing::debug!(handle = %handle, state = ?file.state, polls, "processing state");
        }

        if file.state == FileState::Failed {
            return Err(AnalysisError::ProcessingFailed {
                handle,
                reason: "the service reported FAILED".to_string(),
            }
            .into());
        }

        tracing::info!(handle = %handle, "artifact processed, invoking model");

        let text = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled("analysis cancelled during model call".into()));
            }
            result = self.service.generate(ANALYSIS_PROMPT, &file, self.request_timeout) => {
                result.map_err(|e| match e {
                    Error::Analysis(_) => e,
                    other => AnalysisError::ModelFailed { reason: other.to_string() }.into(),
                })?
            }
        };

        // blank text is unparsable prose, not a model failure
        Ok(parse_model_response(&text))
    }
}

/// Local copy of a remote artifact, removed on every exit path
struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(mut self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch file"
            ),
        }
        self.removed = true;
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
