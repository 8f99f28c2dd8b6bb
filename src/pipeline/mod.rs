//! Pipeline orchestrator split into focused submodules.
//!
//! The `VideoAnalyzer` struct and its methods are organized by domain:
//! - [`tasks`] - Task submission, inspection and deletion
//! - [`run`] - One end-to-end run per task (acquire, stage, analyze, clean up)
//! - [`lifecycle`] - Health and graceful shutdown
//! - [`validation`] - Locator checks done before any resource is allocated
//! - [`workspace`] - Private per-task working directory

mod lifecycle;
mod run;
mod tasks;
mod validation;
mod workspace;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use validation::validate_locator;

use crate::acquisition::{MediaFetcher, StrategyChain, UnavailableFetcher, YtDlpFetcher};
use crate::analysis::{AnalysisClient, AnalysisService, GeminiClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::TaskRegistry;
use crate::storage::StorageAdapter;
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// Main analyzer instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct VideoAnalyzer {
    /// Task records shared by workers and request handlers
    pub(crate) registry: TaskRegistry,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Ordered acquisition strategies
    pub(crate) chain: StrategyChain,
    /// Optional object-storage staging
    pub(crate) storage: StorageAdapter,
    /// Remote analysis cycle
    pub(crate) analysis: AnalysisClient,
    /// Cancelled on shutdown; threaded into acquisition and polling
    pub(crate) shutdown: CancellationToken,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl VideoAnalyzer {
    /// Create an analyzer wired to the production collaborators
    ///
    /// yt-dlp is taken from `acquisition.yt_dlp_path`, or looked up on PATH.
    /// When neither yields a binary the analyzer still starts, but every
    /// acquisition attempt fails with an external-tool error.
    pub async fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn MediaFetcher> =
            if let Some(ref path) = config.acquisition.yt_dlp_path {
                Arc::new(YtDlpFetcher::new(path.clone()))
            } else if config.acquisition.search_path {
                YtDlpFetcher::from_path()
                    .map(|f| Arc::new(f) as Arc<dyn MediaFetcher>)
                    .unwrap_or_else(|| Arc::new(UnavailableFetcher))
            } else {
                Arc::new(UnavailableFetcher)
            };

        if fetcher.name() == UnavailableFetcher.name() {
            tracing::warn!("yt-dlp not found, acquisition will fail until it is installed");
        }

        let service: Arc<dyn AnalysisService> = Arc::new(GeminiClient::new(
            config.analysis.base_url.clone(),
            config.analysis.api_key.clone(),
            config.analysis.model.clone(),
        )?);

        let storage = StorageAdapter::from_config(&config.storage)?;

        Self::from_parts(config, fetcher, service, storage).await
    }

    /// Create an analyzer from explicit collaborators
    pub async fn from_parts(
        config: Config,
        fetcher: Arc<dyn MediaFetcher>,
        service: Arc<dyn AnalysisService>,
        storage: StorageAdapter,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.work_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create work directory '{}': {}",
                        config.work_dir.display(),
                        e
                    ),
                ))
            })?;

        tracing::info!(
            fetcher = fetcher.name(),
            analysis_service = service.name(),
            storage_enabled = storage.is_enabled(),
            strategies = config.acquisition.strategies.len(),
            "Video analyzer initialized"
        );

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let chain = StrategyChain::new(
            fetcher,
            config.acquisition.strategies.clone(),
            config.acquisition.attempt_timeout,
        );
        let analysis = AnalysisClient::new(
            service,
            storage.clone(),
            &config.analysis,
            config.work_dir.join("scratch"),
        );

        Ok(Self {
            registry: TaskRegistry::new(),
            event_tx,
            config: Arc::new(config),
            chain,
            storage,
            analysis,
            shutdown: CancellationToken::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to pipeline events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls behind by more than 1000 events receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers; dropped when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let analyzer = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(analyzer, config).await })
    }
}
