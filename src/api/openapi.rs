//! OpenAPI documentation and schema generation
//!
//! The spec is generated at compile time with utoipa and served at
//! `/openapi.json` (and through Swagger UI at `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the video-analyzer REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "video-analyzer REST API",
        version = "0.1.0",
        description = "Submit YouTube videos for background download and content analysis, then poll for the structured result",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::analyze_video,
        crate::api::routes::task_status,
        crate::api::routes::delete_task,
        crate::api::routes::list_tasks,

        // System
        crate::api::routes::root,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::TaskState,
        crate::types::TaskSummary,
        crate::types::HealthInfo,
        crate::analysis::AnalysisResult,
        crate::analysis::InterestBucket,
        crate::error::FailureKind,

        crate::api::routes::AnalyzeVideoRequest,
        crate::api::routes::AnalyzeVideoResponse,
        crate::api::routes::TaskStatusResponse,
        crate::api::routes::TaskListResponse,
        crate::api::routes::MessageResponse,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Analysis tasks - Submit videos, poll status, list and delete tasks"),
        (name = "system", description = "System endpoints - Liveness, health, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `X-API-Key` header scheme referenced by guarded paths
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-API-Key"),
                    ),
                ),
            );
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_endpoint() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&str> = spec.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/",
            "/health",
            "/analyze-video/",
            "/task-status/{id}",
            "/task/{id}",
            "/tasks",
            "/events",
        ] {
            assert!(paths.contains(&expected), "missing {expected} in {paths:?}");
        }
    }

    #[test]
    fn spec_declares_api_key_scheme_and_schemas() {
        let components = ApiDoc::openapi().components.unwrap();
        assert!(components.security_schemes.contains_key("api_key"));
        assert!(components.schemas.contains_key("AnalysisResult"));
        assert!(components.schemas.contains_key("TaskStatusResponse"));
    }

    #[test]
    fn spec_serializes_as_openapi_3() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(json["openapi"].as_str().unwrap().starts_with("3."));
        assert_eq!(json["info"]["title"], "video-analyzer REST API");
    }
}
