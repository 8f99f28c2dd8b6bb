//! REST API server module
//!
//! The HTTP surface over [`VideoAnalyzer`]: submit a video, poll its task,
//! list and delete tasks, plus liveness, health, events and the OpenAPI spec.

use crate::{Config, Result, VideoAnalyzer};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Path of the OpenAPI document loaded by Swagger UI
pub const SWAGGER_OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Open
/// - `GET /` - Liveness marker
/// - `GET /health` - Health with running-task count and storage mode
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled),
///   reading its document from [`SWAGGER_OPENAPI_PATH`]
///
/// ## Guarded by `X-API-Key`
/// - `POST /analyze-video/` - Create a task and start it in the background
/// - `GET /task-status/:id` - State, result and error of a task
/// - `DELETE /task/:id` - Remove a task that is not in progress
/// - `GET /tasks` - List tasks (`?status=` filter)
/// - `GET /events` - Server-sent events stream
pub fn create_router(analyzer: Arc<VideoAnalyzer>, config: Arc<Config>) -> Router {
    let state = AppState::new(analyzer, config.clone());

    // route_layer only wraps the routes registered so far, so everything
    // added after it stays open
    let router = Router::new()
        .route("/analyze-video/", post(routes::analyze_video))
        .route("/task-status/:id", get(routes::task_status))
        .route("/task/:id", delete(routes::delete_task))
        .route("/tasks", get(routes::list_tasks))
        .route("/events", get(routes::event_stream))
        .route_layer(middleware::from_fn_with_state(
            config.api.api_key.clone(),
            auth::require_api_key,
        ))
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI serves its own copy of the document; `/openapi.json` is taken
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url(SWAGGER_OPENAPI_PATH, ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer for the configured origins (`*` allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Serve the API on the configured bind address until the process exits
pub async fn start_api_server(analyzer: Arc<VideoAnalyzer>, config: Arc<Config>) -> Result<()> {
    serve(analyzer, config, std::future::pending()).await
}

/// Serve the API until `shutdown` resolves, then drain open connections
pub async fn serve<F>(analyzer: Arc<VideoAnalyzer>, config: Arc<Config>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.api.bind_address;
    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(analyzer, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
