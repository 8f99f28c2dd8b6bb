//! End-to-end tests: HTTP client -> REST API -> pipeline -> mocked Gemini

mod common;

use common::*;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::tempdir;
use video_analyzer::storage::FsObjectStore;
use video_analyzer::{StorageAdapter, TaskId, VideoAnalyzer};
use wiremock::MockServer;

const ANSWER: &str = "```json\n{\"topic\": \"Home espresso\", \"summary\": \"Dialing in a grinder.\", \"interest_bucket\": \"Lifestyle & Wellness\"}\n```";

async fn analyzer(
    dir: &std::path::Path,
    gemini: &MockServer,
    availability: &'static str,
    storage: StorageAdapter,
) -> Arc<VideoAnalyzer> {
    Arc::new(
        VideoAnalyzer::from_parts(
            config(dir, gemini),
            Arc::new(FakeFetcher { availability }),
            Arc::new(
                video_analyzer::analysis::GeminiClient::new(
                    gemini.uri(),
                    "gemini-key",
                    "gemini-1.5-flash",
                )
                .unwrap(),
            ),
            storage,
        )
        .await
        .unwrap(),
    )
}

#[tokio::test]
async fn submitted_video_is_analyzed_over_http() {
    let dir = tempdir().unwrap();
    let gemini = MockServer::start().await;
    mount_gemini(&gemini, ANSWER).await;

    let blobs = dir.path().join("blobs");
    let storage = StorageAdapter::new(Arc::new(FsObjectStore::new(&blobs)), "staging");
    let analyzer = analyzer(dir.path(), &gemini, "public", storage).await;
    let addr = spawn_server(analyzer.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/analyze-video/"))
        .header("X-API-Key", API_KEY)
        .json(&json!({"youtube_url": "https://www.youtube.com/watch?v=espresso"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let id: TaskId = body["task_id"].as_str().unwrap().parse().unwrap();

    wait_terminal(&analyzer, id).await;

    let status: Value = client
        .get(format!("http://{addr}/task-status/{id}"))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["topic"], "Home espresso");
    assert_eq!(status["result"]["interest_bucket"], "Lifestyle & Wellness");

    // staged blob and task workspace are gone once the task is terminal
    let leftover = blobs.join("staging").join("videos").join(id.to_string());
    assert!(!leftover.join("clip.mp4").exists());
    let mut work = tokio::fs::read_dir(dir.path().join("work")).await.unwrap();
    while let Some(entry) = work.next_entry().await.unwrap() {
        assert!(
            !entry.file_name().to_string_lossy().starts_with("task_"),
            "workspace {:?} left behind",
            entry.path()
        );
    }

    let listing: Value = client
        .get(format!("http://{addr}/tasks?status=completed"))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["total_tasks"], 1);
    assert_eq!(listing["tasks"][0]["task_id"], id.to_string());
}

#[tokio::test]
async fn private_video_fails_acquisition() {
    let dir = tempdir().unwrap();
    let gemini = MockServer::start().await;
    mount_gemini(&gemini, ANSWER).await;

    let analyzer = analyzer(dir.path(), &gemini, "private", StorageAdapter::disabled()).await;
    let addr = spawn_server(analyzer.clone()).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("http://{addr}/analyze-video/"))
        .header("X-API-Key", API_KEY)
        .json(&json!({"youtube_url": "https://youtu.be/secret"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id: TaskId = body["task_id"].as_str().unwrap().parse().unwrap();

    let task = wait_terminal(&analyzer, id).await;
    assert_eq!(task.state, video_analyzer::TaskState::Failed);
    assert!(task.error.unwrap().contains("private"));

    let uploads = gemini
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path().starts_with("/upload/"))
        .count();
    assert_eq!(uploads, 0);
}

#[tokio::test]
async fn requests_without_key_are_unauthorized() {
    let dir = tempdir().unwrap();
    let gemini = MockServer::start().await;
    let analyzer = analyzer(dir.path(), &gemini, "public", StorageAdapter::disabled()).await;
    let addr = spawn_server(analyzer).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/analyze-video/"))
        .json(&json!({"youtube_url": "https://www.youtube.com/watch?v=x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}
