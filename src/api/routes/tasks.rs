//! Analysis task handlers.

use super::{
    AnalyzeVideoRequest, AnalyzeVideoResponse, ListTasksQuery, MessageResponse,
    TaskListResponse, TaskStatusResponse,
};
use crate::api::AppState;
use crate::error::{ApiError, Error, Result};
use crate::types::{TaskId, TaskState};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Acknowledgement returned when a task has been started
pub const TASK_STARTED_MESSAGE: &str = "Video analysis started in the background.";

/// Parse a path id; anything that is not a task id cannot name a task
fn parse_task_id(raw: &str) -> std::result::Result<TaskId, Response> {
    raw.parse().map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(
                "task_not_found",
                format!("task {} not found", raw),
            )),
        )
            .into_response()
    })
}

/// POST /analyze-video/ - Start analyzing a video
#[utoipa::path(
    post,
    path = "/analyze-video/",
    tag = "tasks",
    request_body = AnalyzeVideoRequest,
    responses(
        (status = 200, description = "Task created, analysis runs in the background", body = AnalyzeVideoResponse),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 422, description = "Body is not an absolute http(s) URL", body = ApiError),
        (status = 503, description = "Server is shutting down", body = ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn analyze_video(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalyzeVideoRequest>, JsonRejection>,
) -> Result<Json<AnalyzeVideoResponse>> {
    let Json(request) = body.map_err(|e| Error::Validation(e.body_text()))?;

    let url = url::Url::parse(request.youtube_url.trim()).map_err(|e| {
        Error::Validation(format!(
            "youtube_url must be an absolute URL, got '{}': {}",
            request.youtube_url, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "youtube_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    let task_id = state.analyzer.submit(request.youtube_url.trim()).await?;

    Ok(Json(AnalyzeVideoResponse {
        message: TASK_STARTED_MESSAGE.to_string(),
        task_id,
    }))
}

/// GET /task-status/:id - Get a task's state and outcome
#[utoipa::path(
    get,
    path = "/task-status/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task state with result or error", body = TaskStatusResponse),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn task_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.analyzer.task(id).await {
        Ok(task) => Json(TaskStatusResponse {
            status: task.state,
            result: task.result,
            error: task.error,
            error_kind: task.error_kind,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /task/:id - Remove a finished or not yet started task
#[utoipa::path(
    delete,
    path = "/task/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 400, description = "Task is in progress", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.analyzer.delete_task(id).await {
        Ok(()) => Json(MessageResponse {
            message: format!("Task {} deleted successfully", id),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /tasks - List tasks, optionally filtered by state
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Tasks in creation order", body = TaskListResponse),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 422, description = "Unknown status filter", body = ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>> {
    let filter = query
        .status
        .as_deref()
        .map(str::parse::<TaskState>)
        .transpose()?;

    let tasks = state.analyzer.list_tasks(filter).await;
    Ok(Json(TaskListResponse {
        total_tasks: tasks.len(),
        tasks,
    }))
}
