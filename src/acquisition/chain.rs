//! Ordered multi-strategy acquisition

use super::strategy::{AcquisitionStrategy, MediaContainer};
use super::traits::MediaFetcher;
use crate::error::{Error, Result};
use crate::retry::{RetryError, with_retry};
use crate::types::ArtifactRef;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A successfully acquired artifact
#[derive(Debug, Clone)]
pub struct Acquired {
    /// The downloaded file
    pub artifact: ArtifactRef,
    /// Container detected from the file extension
    pub container: MediaContainer,
    /// Name of the strategy that produced it
    pub strategy: String,
}

/// Tries each configured strategy in order until one yields a media file
#[derive(Clone)]
pub struct StrategyChain {
    fetcher: Arc<dyn MediaFetcher>,
    strategies: Arc<[AcquisitionStrategy]>,
    attempt_timeout: Duration,
}

impl StrategyChain {
    /// Create a chain over `strategies` (tried in the given order)
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        strategies: Vec<AcquisitionStrategy>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            strategies: strategies.into(),
            attempt_timeout,
        }
    }

    /// Strategies in priority order
    pub fn strategies(&self) -> &[AcquisitionStrategy] {
        &self.strategies
    }

    /// Acquire `locator` into `workspace`
    ///
    /// `on_strategy_failed` is called once for each strategy that gives up.
    /// Fails with [`Error::AcquisitionExhausted`] only after every strategy has
    /// been attempted, or with [`Error::Cancelled`] when `cancel` fires.
    pub async fn acquire<F>(
        &self,
        locator: &str,
        workspace: &Path,
        cancel: &CancellationToken,
        mut on_strategy_failed: F,
    ) -> Result<Acquired>
    where
        F: FnMut(&AcquisitionStrategy, &Error) + Send,
    {
        let mut last_error: Option<Error> = None;

        for strategy in self.strategies.iter() {
            tracing::info!(
                strategy = %strategy.name,
                fetcher = self.fetcher.name(),
                "trying acquisition strategy"
            );

            // Leftovers from an earlier strategy must not be mistaken for output
            clear_workspace(workspace).await?;

            match self.attempt(strategy, locator, workspace, cancel).await {
                Ok((path, container)) => {
                    tracing::info!(
                        strategy = %strategy.name,
                        path = %path.display(),
                        "acquisition succeeded"
                    );
                    return Ok(Acquired {
                        artifact: ArtifactRef::local(path),
                        container,
                        strategy: strategy.name.clone(),
                    });
                }
                Err(RetryError::Cancelled) => {
                    return Err(Error::Cancelled(format!(
                        "acquisition cancelled during strategy '{}'",
                        strategy.name
                    )));
                }
                Err(RetryError::Failed(e)) => {
                    tracing::warn!(strategy = %strategy.name, error = %e, "strategy failed");
                    on_strategy_failed(strategy, &e);
                    last_error = Some(e);
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no acquisition strategies configured".to_string());

        let title = self.probe_title(locator, cancel).await;

        Err(Error::AcquisitionExhausted {
            attempted: self.strategies.len(),
            title,
            last_error,
        })
    }

    async fn attempt(
        &self,
        strategy: &AcquisitionStrategy,
        locator: &str,
        workspace: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<(PathBuf, MediaContainer), RetryError<Error>> {
        let meta = with_retry(&strategy.retry, cancel, move || async move {
            self.bounded(self.fetcher.probe(locator, strategy)).await
        })
        .await?;

        if meta.is_restricted() {
            return Err(RetryError::Failed(Error::ResourceUnavailable {
                availability: meta.availability.unwrap_or_default(),
                title: meta.title,
            }));
        }

        with_retry(&strategy.retry, cancel, move || async move {
            self.bounded(self.fetcher.download(locator, strategy, workspace))
                .await?;
            find_artifact(workspace)
                .await?
                .ok_or_else(|| Error::ArtifactMissing {
                    workspace: workspace.to_path_buf(),
                })
        })
        .await
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.attempt_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Acquisition(format!(
                "attempt timed out after {}s",
                self.attempt_timeout.as_secs_f64()
            ))),
        }
    }

    /// Best-effort title lookup; its failure never masks the real error
    async fn probe_title(&self, locator: &str, cancel: &CancellationToken) -> Option<String> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.bounded(self.fetcher.probe_title(locator)) => match result {
                Ok(title) => title,
                Err(e) => {
                    tracing::debug!(error = %e, "title probe failed");
                    None
                }
            },
        }
    }
}

/// First accepted media file in `workspace`, by file name
pub(crate) async fn find_artifact(workspace: &Path) -> Result<Option<(PathBuf, MediaContainer)>> {
    let mut entries = tokio::fs::read_dir(workspace).await?;
    let mut found = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(container) = MediaContainer::from_path(&path) {
            found.push((path, container));
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found.into_iter().next())
}

async fn clear_workspace(workspace: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(workspace).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
    }
    Ok(())
}
