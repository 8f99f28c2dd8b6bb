//! `X-API-Key` authentication
//!
//! Applied with `route_layer` to the task endpoints only; `/` and `/health`
//! stay open for liveness probes.

use crate::error::ApiError;
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `X-API-Key` does not match the configured secret
///
/// With no secret configured every request passes.
///
/// ```no_run
/// use axum::{Router, middleware, routing::get};
/// use video_analyzer::api::auth::require_api_key;
///
/// let router: Router = Router::new()
///     .route("/tasks", get(|| async { "[]" }))
///     .route_layer(middleware::from_fn_with_state(
///         Some("secret".to_string()),
///         require_api_key,
///     ));
/// ```
pub async fn require_api_key(
    State(expected): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "rejected request with wrong API key");
            unauthorized("Invalid API key")
        }
        None => unauthorized("Missing X-API-Key header"),
    }
}

/// Compare without short-circuiting on the first differing byte
fn keys_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(message))).into_response()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, middleware, routing::get};
    use tower::ServiceExt;

    fn app(key: Option<&str>) -> Router {
        Router::new()
            .route("/guarded", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(
                key.map(str::to_string),
                require_api_key,
            ))
    }

    async fn call(app: Router, header: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/guarded");
        if let Some(value) = header {
            builder = builder.header("X-API-Key", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn matching_key_passes() {
        let (status, body) = call(app(Some("s3cret")), Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn wrong_or_missing_key_is_401_json() {
        let (status, body) = call(app(Some("s3cret")), Some("S3CRET")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let error: ApiError = serde_json::from_str(&body).unwrap();
        assert_eq!(error.error.code, "unauthorized");
        assert_eq!(error.error.message, "Invalid API key");

        let (status, body) = call(app(Some("s3cret")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Missing X-API-Key header"));

        let (status, _) = call(app(Some("s3cret")), Some("s3cret ")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn no_configured_key_allows_everything() {
        let (status, _) = call(app(None), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn keys_match_requires_equal_length() {
        assert!(keys_match(b"abc", b"abc"));
        assert!(!keys_match(b"abc", b"abcd"));
        assert!(!keys_match(b"abc", b"abd"));
        assert!(keys_match(b"", b""));
    }
}
