//! `video-analyzer` server binary
//!
//! Loads configuration from the environment (and `.env` when present),
//! serves the REST API and shuts down gracefully on SIGTERM/SIGINT.

use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use video_analyzer::{Config, VideoAnalyzer, api, wait_for_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let analyzer = VideoAnalyzer::new(config).await?;
    let config = analyzer.get_config();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(api::serve(Arc::new(analyzer.clone()), config, async move {
        stop_rx.await.ok();
    }));

    wait_for_signal().await;

    // stop accepting work and drain running tasks before closing connections
    analyzer.shutdown().await?;
    stop_tx.send(()).ok();

    server.await??;
    Ok(())
}
