//! Shared fixtures for video-analyzer integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use video_analyzer::acquisition::{AcquisitionStrategy, MediaFetcher, MediaMetadata};
use video_analyzer::config::RetryConfig;
use video_analyzer::{Config, Error, Result, Task, TaskId, VideoAnalyzer};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "integration-key";

/// Fetcher that writes a small file, or reports the video as private
pub struct FakeFetcher {
    pub availability: &'static str,
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn probe(&self, _locator: &str, _strategy: &AcquisitionStrategy) -> Result<MediaMetadata> {
        Ok(MediaMetadata {
            title: Some("Integration clip".into()),
            availability: Some(self.availability.into()),
        })
    }

    async fn download(
        &self,
        _locator: &str,
        _strategy: &AcquisitionStrategy,
        workspace: &Path,
    ) -> Result<()> {
        tokio::fs::write(workspace.join("clip.mp4"), b"not really a video")
            .await
            .map_err(Error::Io)
    }

    async fn probe_title(&self, _locator: &str) -> Result<Option<String>> {
        Ok(Some("Integration clip".into()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn strategy(name: &str) -> AcquisitionStrategy {
    AcquisitionStrategy {
        name: name.to_string(),
        client_identity: name.to_lowercase(),
        request_headers: Default::default(),
        retry: RetryConfig::fixed(0, Duration::from_millis(1)),
        quality_selector: "worst".into(),
        age_bypass: false,
        player_skip: Vec::new(),
        skip_transports: Vec::new(),
    }
}

/// Config pointing the analysis client at `gemini` and rooted in `dir`
pub fn config(dir: &Path, gemini: &MockServer) -> Config {
    let mut config = Config::default();
    config.work_dir = dir.join("work");
    config.api.api_key = Some(API_KEY.into());
    config.analysis.api_key = "gemini-key".into();
    config.analysis.base_url = gemini.uri();
    config.analysis.poll_interval = Duration::from_millis(5);
    config.acquisition.strategies = vec![strategy("web"), strategy("android")];
    config
}

/// Mount a Gemini Files + generateContent happy path answering `answer`
pub async fn mount_gemini(server: &MockServer, answer: &str) {
    let file = json!({
        "name": "files/clip",
        "uri": format!("{}/v1beta/files/clip", server.uri()),
        "mimeType": "video/mp4",
        "state": "ACTIVE"
    });

    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "file": file })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1beta/files/clip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/.+:generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [ { "text": answer } ] } }]
        })))
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1beta/files/clip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
}

/// Serve the router on an ephemeral port and return its address
pub async fn spawn_server(analyzer: Arc<VideoAnalyzer>) -> SocketAddr {
    let app = video_analyzer::api::create_router(analyzer.clone(), analyzer.get_config());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

/// Poll until task `id` is terminal
pub async fn wait_terminal(analyzer: &VideoAnalyzer, id: TaskId) -> Task {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let task = analyzer.task(id).await.unwrap();
            if task.state.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not finish")
}
