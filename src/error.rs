//! Error types for video-analyzer
//!
//! This module provides the error taxonomy for the task pipeline, including:
//! - Domain-specific error types (analysis service, object storage, task registry)
//! - Classification of pipeline failures into a serialisable [`FailureKind`]
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{TaskId, TaskState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for video-analyzer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for video-analyzer
///
/// Failures raised inside acquisition or analysis never reach the triggering
/// request; the orchestrator converts them into a `Failed` task using
/// [`Error::failure_kind`] and the `Display` text.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "API_KEY")
        key: Option<String>,
    },

    /// Malformed or disallowed locator
    #[error("validation error: {0}")]
    Validation(String),

    /// A single acquisition attempt failed
    #[error("{0}")]
    Acquisition(String),

    /// Metadata marks the resource as restricted, downloading is pointless
    #[error("video is {availability} or unavailable{}", title_suffix(.title))]
    ResourceUnavailable {
        /// Availability reported by the metadata probe (e.g. "private")
        availability: String,
        /// Resource title, when the probe returned one
        title: Option<String>,
    },

    /// The download finished but left no accepted media container behind
    #[error("downloaded file not found in {}", workspace.display())]
    ArtifactMissing {
        /// Workspace that was scanned
        workspace: PathBuf,
    },

    /// Every configured acquisition strategy failed
    #[error(
        "all {attempted} download strategies failed{}; error from last attempt: {last_error}",
        title_suffix(.title)
    )]
    AcquisitionExhausted {
        /// Number of strategies attempted
        attempted: usize,
        /// Title from the final metadata-only probe, if it succeeded
        title: Option<String>,
        /// Error text of the last strategy
        last_error: String,
    },

    /// Remote analysis service error
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Object storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Task registry error
    #[error("{0}")]
    Task(#[from] TaskError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (yt-dlp)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Work was cancelled before it finished
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn title_suffix(title: &Option<String>) -> String {
    match title {
        Some(t) => format!(" for video '{}'", t),
        None => String::new(),
    }
}

/// Remote analysis service errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The artifact could not be uploaded to the analysis service
    #[error("upload failed: {reason}")]
    UploadFailed {
        /// The reason the upload failed
        reason: String,
    },

    /// The service reported a failed processing state or never finished
    #[error("video processing failed for {handle}: {reason}")]
    ProcessingFailed {
        /// Remote handle of the uploaded file
        handle: String,
        /// The reason processing failed
        reason: String,
    },

    /// The generative model call failed or returned no text
    #[error("model invocation failed: {reason}")]
    ModelFailed {
        /// The reason the model call failed
        reason: String,
    },
}

/// Object storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload to the object store failed
    #[error("failed to upload {} to {uri}: {reason}", path.display())]
    UploadFailed {
        /// Local file being uploaded
        path: PathBuf,
        /// Destination `scheme://bucket/key`
        uri: String,
        /// The reason the upload failed
        reason: String,
    },

    /// Download from the object store failed
    #[error("failed to download {uri}: {reason}")]
    DownloadFailed {
        /// Source `scheme://bucket/key`
        uri: String,
        /// The reason the download failed
        reason: String,
    },

    /// Deletion from the object store failed
    #[error("failed to delete {uri}: {reason}")]
    DeleteFailed {
        /// `scheme://bucket/key` being deleted
        uri: String,
        /// The reason the delete failed
        reason: String,
    },

    /// The object does not exist
    #[error("object {uri} not found")]
    NotFound {
        /// `scheme://bucket/key` that was looked up
        uri: String,
    },

    /// A string could not be parsed as `scheme://bucket/key`, or a key is unsafe
    #[error("invalid object reference '{0}'")]
    InvalidReference(String),

    /// A remote reference was used while staging is disabled
    #[error("object storage is disabled")]
    Disabled,
}

/// Task registry errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task with this ID exists
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: TaskId,
    },

    /// Operation not allowed in the task's current state
    #[error("cannot {operation} task {id} in state {current_state}")]
    InvalidState {
        /// The task ID
        id: TaskId,
        /// The operation that was attempted (e.g., "delete", "transition to completed")
        operation: String,
        /// The state that prevents the operation
        current_state: TaskState,
    },
}

/// Classification of a failed task, stored alongside the error message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Locator malformed or outside the supported resource family
    ValidationError,
    /// Every acquisition strategy failed
    AcquisitionExhausted,
    /// Upload to the analysis service failed
    UploadFailed,
    /// The analysis service failed to process the artifact
    ProcessingFailed,
    /// The generative model call failed
    ModelError,
    /// Object storage failed in a way that aborted the run
    StorageError,
    /// Work was cancelled (shutdown)
    Cancelled,
    /// Anything else (I/O, workspace allocation, ...)
    InternalError,
}

impl Error {
    /// Classify this error for storage on a failed task
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Validation(_) => FailureKind::ValidationError,
            Error::AcquisitionExhausted { .. }
            | Error::Acquisition(_)
            | Error::ResourceUnavailable { .. }
            | Error::ArtifactMissing { .. } => FailureKind::AcquisitionExhausted,
            Error::Analysis(AnalysisError::UploadFailed { .. }) => FailureKind::UploadFailed,
            Error::Analysis(AnalysisError::ProcessingFailed { .. }) => {
                FailureKind::ProcessingFailed
            }
            Error::Analysis(AnalysisError::ModelFailed { .. }) => FailureKind::ModelError,
            Error::Storage(_) => FailureKind::StorageError,
            Error::Cancelled(_) | Error::ShuttingDown => FailureKind::Cancelled,
            _ => FailureKind::InternalError,
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task 6f1c... not found",
///     "details": {
///       "task_id": "6f1c..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "task_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::Task(TaskError::InvalidState { .. }) => 400,

            // 404 Not Found
            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Storage(StorageError::NotFound { .. }) => 404,

            // 422 Unprocessable Entity
            Error::Validation(_) => 422,
            Error::Storage(StorageError::InvalidReference(_)) => 422,

            // 502 Bad Gateway - upstream services
            Error::Acquisition(_)
            | Error::ResourceUnavailable { .. }
            | Error::ArtifactMissing { .. }
            | Error::AcquisitionExhausted { .. } => 502,
            Error::Analysis(_) => 502,
            Error::Storage(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,
            Error::Cancelled(_) => 503,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Acquisition(_) => "acquisition_failed",
            Error::ResourceUnavailable { .. } => "resource_unavailable",
            Error::ArtifactMissing { .. } => "artifact_missing",
            Error::AcquisitionExhausted { .. } => "acquisition_exhausted",
            Error::Analysis(e) => match e {
                AnalysisError::UploadFailed { .. } => "upload_failed",
                AnalysisError::ProcessingFailed { .. } => "processing_failed",
                AnalysisError::ModelFailed { .. } => "model_error",
            },
            Error::Storage(e) => match e {
                StorageError::UploadFailed { .. } => "storage_upload_failed",
                StorageError::DownloadFailed { .. } => "storage_download_failed",
                StorageError::DeleteFailed { .. } => "storage_delete_failed",
                StorageError::NotFound { .. } => "object_not_found",
                StorageError::InvalidReference(_) => "invalid_reference",
                StorageError::Disabled => "storage_disabled",
            },
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::InvalidState { .. } => "invalid_state",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Cancelled(_) => "cancelled",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Task(TaskError::NotFound { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::InvalidState {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "task_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
