use super::*;
use crate::api::routes::ROOT_MESSAGE;

#[tokio::test]
async fn root_reports_running() {
    let dir = tempdir().unwrap();
    let (_analyzer, app) = test_app(dir.path()).await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], ROOT_MESSAGE);
}

#[tokio::test]
async fn health_reports_idle_service() {
    let dir = tempdir().unwrap();
    let (_analyzer, app) = test_app(dir.path()).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_tasks"], 0);
    assert_eq!(body["using_gcs"], false);
    assert!(body["gcs_bucket"].is_null());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn openapi_json_is_served() {
    let dir = tempdir().unwrap();
    let (_analyzer, app) = test_app(dir.path()).await;

    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/analyze-video/"].is_object());
    assert!(body["components"]["securitySchemes"]["api_key"].is_object());
}

#[tokio::test]
async fn event_stream_is_sse() {
    let dir = tempdir().unwrap();
    let (analyzer, app) = test_app(dir.path()).await;

    let response = app.oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(
        content_type.contains("text/event-stream"),
        "unexpected content type {content_type}"
    );

    let mut rx = analyzer.subscribe();
    analyzer.emit_event(crate::types::Event::Shutdown);
    let received = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(matches!(received, Ok(Ok(crate::types::Event::Shutdown))));
}
