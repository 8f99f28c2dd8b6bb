//! Core types for video-analyzer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::error::FailureKind;

/// Unique identifier for an analysis task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task lifecycle state
///
/// `Starting → InProgress → {Completed | Failed}`. `Completed` and `Failed`
/// are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, worker not yet running
    Starting,
    /// Worker is acquiring or analyzing
    InProgress,
    /// Analysis finished, result available
    Completed,
    /// Pipeline failed, error available
    Failed,
}

impl TaskState {
    /// Whether no further transition can leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Wire name of the state (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Starting => "starting",
            TaskState::InProgress => "in_progress",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starting" => Ok(TaskState::Starting),
            "in_progress" => Ok(TaskState::InProgress),
            "completed" => Ok(TaskState::Completed),
            "failed" => Ok(TaskState::Failed),
            other => Err(crate::error::Error::Validation(format!(
                "unknown task status '{}' (expected starting, in_progress, completed or failed)",
                other
            ))),
        }
    }
}

/// A task record as held by the registry
///
/// `result` is set iff `state == Completed`, `error` (and `error_kind`) iff
/// `state == Failed`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Current state
    pub state: TaskState,
    /// Locator submitted for analysis
    pub source_locator: String,
    /// Analysis result (completed tasks only)
    pub result: Option<AnalysisResult>,
    /// Human-readable failure message (failed tasks only)
    pub error: Option<String>,
    /// Failure classification (failed tasks only)
    pub error_kind: Option<FailureKind>,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task last changed
    pub updated_at: DateTime<Utc>,
}

/// Condensed task view used by listings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskSummary {
    /// Task identifier
    pub task_id: TaskId,
    /// Current state
    pub status: TaskState,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task last changed
    pub updated_at: DateTime<Utc>,
    /// Locator submitted for analysis
    pub youtube_url: String,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            status: task.state,
            created_at: task.created_at,
            updated_at: task.updated_at,
            youtube_url: task.source_locator.clone(),
        }
    }
}

/// State change requested of the registry
///
/// The payload travels with the target state so a terminal record can never
/// be written without its result or error.
#[derive(Clone, Debug)]
pub enum TaskUpdate {
    /// Worker has started
    InProgress,
    /// Analysis succeeded
    Completed(AnalysisResult),
    /// Pipeline failed
    Failed {
        /// Failure classification
        kind: FailureKind,
        /// Human-readable message
        message: String,
    },
}

impl TaskUpdate {
    /// The state this update moves the task into
    pub fn target_state(&self) -> TaskState {
        match self {
            TaskUpdate::InProgress => TaskState::InProgress,
            TaskUpdate::Completed(_) => TaskState::Completed,
            TaskUpdate::Failed { .. } => TaskState::Failed,
        }
    }
}

/// A downloaded media artifact
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Location of the file inside the task workspace
    pub local_path: PathBuf,
    /// Staged copy, if the artifact was uploaded to object storage
    pub remote_uri: Option<String>,
}

impl ArtifactRef {
    /// Create a reference to a local-only artifact
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: path.into(),
            remote_uri: None,
        }
    }

    /// File name of the artifact, falling back to `video` when it has none
    pub fn file_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }
}

/// Events emitted while tasks move through the pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task created and worker spawned
    Queued {
        /// Task ID
        id: TaskId,
        /// Submitted locator
        locator: String,
    },

    /// Strategy chain started
    Acquiring {
        /// Task ID
        id: TaskId,
    },

    /// One acquisition strategy failed, the chain moves on
    StrategyFailed {
        /// Task ID
        id: TaskId,
        /// Strategy name
        strategy: String,
        /// Failure text
        error: String,
    },

    /// Artifact downloaded
    Acquired {
        /// Task ID
        id: TaskId,
        /// Strategy that produced the artifact
        strategy: String,
        /// Artifact file name
        file_name: String,
    },

    /// Artifact uploaded to object storage
    Staged {
        /// Task ID
        id: TaskId,
        /// `scheme://bucket/key` reference
        reference: String,
    },

    /// Remote analysis started
    Analyzing {
        /// Task ID
        id: TaskId,
    },

    /// Task reached `Completed`
    Completed {
        /// Task ID
        id: TaskId,
    },

    /// Task reached `Failed`
    Failed {
        /// Task ID
        id: TaskId,
        /// Failure classification
        kind: FailureKind,
        /// Failure message
        error: String,
    },

    /// Task deleted from the registry
    Removed {
        /// Task ID
        id: TaskId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

impl Event {
    /// Short event name used for the SSE `event:` field
    pub fn name(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Acquiring { .. } => "acquiring",
            Event::StrategyFailed { .. } => "strategy_failed",
            Event::Acquired { .. } => "acquired",
            Event::Staged { .. } => "staged",
            Event::Analyzing { .. } => "analyzing",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Removed { .. } => "removed",
            Event::Shutdown => "shutdown",
        }
    }
}

/// Service health snapshot
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthInfo {
    /// Always `healthy` while the process answers
    pub status: String,
    /// Time the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Number of tasks currently `in_progress`
    pub active_tasks: usize,
    /// Whether artifacts are staged through object storage
    #[serde(rename = "using_gcs")]
    pub storage_enabled: bool,
    /// Staging bucket, when storage is enabled
    #[serde(rename = "gcs_bucket")]
    pub storage_bucket: Option<String>,
}
