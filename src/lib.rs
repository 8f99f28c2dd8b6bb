//! # video-analyzer
//!
//! Background service that downloads short online videos and asks a
//! multimodal model what they are about.
//!
//! A client submits a YouTube locator and gets a task id back immediately.
//! A worker then walks a chain of download strategies until one produces a
//! media file, optionally stages it in object storage, uploads it to the
//! analysis service and stores the structured answer (topic, summary,
//! interest bucket) on the task. Clients poll the task, or subscribe to
//! events.
//!
//! ## Quick Start
//!
//! ```no_run
//! use video_analyzer::{Config, VideoAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let analyzer = VideoAnalyzer::new(config).await?;
//!
//!     let mut events = analyzer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = analyzer.submit("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//!     println!("task {id} started");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Media acquisition through a chain of download strategies
pub mod acquisition;
/// Remote multimodal analysis and answer parsing
pub mod analysis;
/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Task orchestration (decomposed into focused submodules)
pub mod pipeline;
/// In-memory task registry
pub mod registry;
/// Retry logic with exponential backoff
pub mod retry;
/// Optional object-storage staging
pub mod storage;
mod streaming;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use acquisition::{AcquisitionStrategy, MediaFetcher, StrategyChain};
pub use analysis::{AnalysisResult, AnalysisService, InterestBucket};
pub use config::{Config, StorageBackend};
pub use error::{ApiError, Error, ErrorDetail, FailureKind, Result, ToHttpStatus};
pub use pipeline::VideoAnalyzer;
pub use registry::TaskRegistry;
pub use storage::{ObjectStore, StorageAdapter};
pub use types::{Event, HealthInfo, Task, TaskId, TaskState, TaskSummary};

/// Run the analyzer until a termination signal arrives, then shut it down.
///
/// - **Unix:** SIGTERM or SIGINT, falling back to whichever handler could be
///   registered.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use video_analyzer::{Config, VideoAnalyzer, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let analyzer = VideoAnalyzer::new(Config::from_env()?).await?;
///     let _api = analyzer.spawn_api_server();
///
///     run_with_shutdown(analyzer).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(analyzer: VideoAnalyzer) -> Result<()> {
    wait_for_signal().await;
    analyzer.shutdown().await
}

/// Resolve once the process is asked to terminate
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "No signal handlers could be registered, using ctrl_c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Resolve once the process is asked to terminate
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
