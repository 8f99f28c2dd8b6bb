//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] — Submit, inspect, list and delete analysis tasks
//! - [`system`] — Root marker, health, events, OpenAPI

use crate::analysis::AnalysisResult;
use crate::error::FailureKind;
use crate::types::{TaskId, TaskState, TaskSummary};
use serde::{Deserialize, Serialize};

mod system;
mod tasks;

pub use system::*;
pub use tasks::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /analyze-video/
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnalyzeVideoRequest {
    /// Absolute http(s) URL of the video
    pub youtube_url: String,
}

/// Response for POST /analyze-video/
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnalyzeVideoResponse {
    /// Fixed acknowledgement text
    pub message: String,
    /// Identifier to poll with GET /task-status/{id}
    pub task_id: TaskId,
}

/// Response for GET /task-status/{id}
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskStatusResponse {
    /// Current state
    pub status: TaskState,
    /// Analysis result (completed tasks only)
    pub result: Option<AnalysisResult>,
    /// Failure message (failed tasks only)
    pub error: Option<String>,
    /// Failure classification (failed tasks only)
    pub error_kind: Option<FailureKind>,
}

/// Query parameters for GET /tasks
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    /// Only tasks in this state: starting, in_progress, completed or failed
    pub status: Option<String>,
}

/// Response for GET /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskListResponse {
    /// Number of tasks in `tasks`
    pub total_tasks: usize,
    /// Task summaries in creation order
    pub tasks: Vec<TaskSummary>,
}

/// Plain `{"message": ...}` response
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
}
