//! REST API server example
//!
//! Runs the analyzer with the REST API on localhost and a local directory
//! standing in for object storage.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8000/swagger-ui
//! - Submit a video via POST http://localhost:8000/analyze-video/
//! - Poll it via GET http://localhost:8000/task-status/{id}
//! - Stream events via GET http://localhost:8000/events
//!
//! Requires `GEMINI_API_KEY` in the environment and `yt-dlp` on `PATH`.

use std::net::SocketAddr;
use video_analyzer::config::{ApiConfig, StorageBackend};
use video_analyzer::{Config, VideoAnalyzer, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut config = Config::from_env()?;

    config.api = ApiConfig {
        bind_address: "127.0.0.1:8000".parse::<SocketAddr>()?,
        api_key: Some("demo-key".to_string()),
        cors_enabled: true,
        cors_origins: vec!["*".to_string()],
        swagger_ui: true,
    };

    config.storage.enabled = true;
    config.storage.backend = StorageBackend::Filesystem;
    config.storage.root = std::env::temp_dir().join("video-analyzer-demo-blobs");

    let analyzer = VideoAnalyzer::new(config).await?;
    let _api = analyzer.spawn_api_server();

    println!("API listening on http://127.0.0.1:8000 (X-API-Key: demo-key)");
    println!("Swagger UI: http://127.0.0.1:8000/swagger-ui");

    run_with_shutdown(analyzer).await?;
    Ok(())
}
