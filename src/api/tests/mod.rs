use super::*;
use crate::pipeline::test_helpers::{
    GOOD_ANSWER, ScriptedFetcher, ScriptedService, build, default_analyzer, test_config,
    wait_event, wait_terminal,
};
use crate::storage::StorageAdapter;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

mod system;

const KEY: &str = "test-key";

/// Analyzer with the default scripted collaborators plus its router
async fn test_app(dir: &std::path::Path) -> (Arc<VideoAnalyzer>, Router) {
    let analyzer = Arc::new(default_analyzer(dir).await);
    let app = create_router(analyzer.clone(), analyzer.get_config());
    (analyzer, app)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(auth::API_KEY_HEADER, KEY)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(auth::API_KEY_HEADER, KEY)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(auth::API_KEY_HEADER, KEY)
        .body(Body::empty())
        .unwrap()
}

/// Send one request and decode the JSON body (Null when empty)
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn guarded_routes_reject_missing_key() {
    let dir = tempdir().unwrap();
    let (_analyzer, app) = test_app(dir.path()).await;

    for (method, uri) in [
        ("POST", "/analyze-video/"),
        ("GET", "/task-status/00000000-0000-0000-0000-000000000000"),
        ("DELETE", "/task/00000000-0000-0000-0000-000000000000"),
        ("GET", "/tasks"),
        ("GET", "/events"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"]["message"], "Missing X-API-Key header");
    }
}

#[tokio::test]
async fn guarded_routes_reject_wrong_key() {
    let dir = tempdir().unwrap();
    let (_analyzer, app) = test_app(dir.path()).await;

    let request = Request::builder()
        .uri("/tasks")
        .header(auth::API_KEY_HEADER, "not-the-key")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid API key");
}

#[tokio::test]
async fn open_routes_need_no_key() {
    let dir = tempdir().unwrap();
    let (_analyzer, app) = test_app(dir.path()).await;

    for uri in ["/", "/health", "/openapi.json"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn no_configured_key_leaves_every_route_open() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path(), &["A"]);
    config.api.api_key = None;
    let analyzer = Arc::new(
        build(
            config,
            ScriptedFetcher::succeeding(),
            ScriptedService::answering(GOOD_ANSWER),
            StorageAdapter::disabled(),
        )
        .await,
    );
    let app = create_router(analyzer.clone(), analyzer.get_config());

    let request = Request::builder().uri("/tasks").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_tasks"], 0);
}

#[tokio::test]
async fn cors_headers_follow_config() {
    let dir = tempdir().unwrap();
    let analyzer = Arc::new(default_analyzer(dir.path()).await);

    let mut config = (*analyzer.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["http://localhost:3000".to_string()];
    let app = create_router(analyzer.clone(), Arc::new(config.clone()));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );

    config.api.cors_enabled = false;
    let app = create_router(analyzer, Arc::new(config));
    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn default_api_config_serves_docs_and_swagger_ui() {
    let dir = tempdir().unwrap();
    let analyzer = Arc::new(default_analyzer(dir.path()).await);

    let mut config = (*analyzer.get_config()).clone();
    config.api = crate::config::ApiConfig {
        api_key: Some(KEY.to_string()),
        ..Default::default()
    };
    assert!(config.api.swagger_ui);
    let app = create_router(analyzer, Arc::new(config));

    for uri in ["/openapi.json", SWAGGER_OPENAPI_PATH] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body["paths"]["/analyze-video/"].is_object(), "{uri}");
    }

    let request = Request::builder()
        .uri("/swagger-ui/")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("<html") || page.contains("<!DOCTYPE html>"));

    let (status, _) = send(&app, get("/tasks")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn swagger_ui_is_optional() {
    let dir = tempdir().unwrap();
    let analyzer = Arc::new(default_analyzer(dir.path()).await);

    let mut config = (*analyzer.get_config()).clone();
    config.api.swagger_ui = false;
    let app = create_router(analyzer, Arc::new(config));

    let request = Request::builder()
        .uri("/swagger-ui/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn server_stops_on_shutdown_signal() {
    let dir = tempdir().unwrap();
    let analyzer = Arc::new(default_analyzer(dir.path()).await);

    let mut config = (*analyzer.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(analyzer, Arc::new(config), async move {
        stop_rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn spawn_api_server_runs_in_background() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path(), &["A"]);
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let analyzer = build(
        config,
        ScriptedFetcher::succeeding(),
        ScriptedService::answering(GOOD_ANSWER),
        StorageAdapter::disabled(),
    )
    .await;

    let handle = analyzer.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());
    handle.abort();
}
