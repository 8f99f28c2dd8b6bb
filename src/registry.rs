//! In-memory task registry
//!
//! The registry is the only state shared between task workers and request
//! handlers. Every read and write goes through one `RwLock`, so a reader never
//! sees a half-applied transition. Records live for the process lifetime only.

use crate::error::{Result, TaskError};
use crate::types::{Task, TaskId, TaskState, TaskSummary, TaskUpdate};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct Entry {
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    tasks: HashMap<TaskId, Entry>,
}

/// Concurrency-safe store of task records
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task in `Starting` state
    pub async fn create(&self, locator: impl Into<String>) -> Task {
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(),
            state: TaskState::Starting,
            source_locator: locator.into(),
            result: None,
            error: None,
            error_kind: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.insert(
            task.id,
            Entry {
                seq,
                task: task.clone(),
            },
        );
        task
    }

    /// Apply `update` to task `id`
    ///
    /// Allowed moves are `Starting → InProgress`, `Starting → Failed`,
    /// `InProgress → Completed` and `InProgress → Failed`. Anything else,
    /// including any move out of a terminal state, is `InvalidState`.
    pub async fn transition(&self, id: TaskId, update: TaskUpdate) -> Result<Task> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .tasks
            .get_mut(&id)
            .ok_or(TaskError::NotFound { id })?;
        let task = &mut entry.task;

        let target = update.target_state();
        let allowed = matches!(
            (task.state, target),
            (TaskState::Starting, TaskState::InProgress)
                | (TaskState::Starting, TaskState::Failed)
                | (TaskState::InProgress, TaskState::Completed)
                | (TaskState::InProgress, TaskState::Failed)
        );
        if !allowed {
            return Err(TaskError::InvalidState {
                id,
                operation: format!("transition to {}", target),
                current_state: task.state,
            }
            .into());
        }

        match update {
            TaskUpdate::InProgress => {}
            TaskUpdate::Completed(result) => {
                task.result = Some(result);
                task.error = None;
                task.error_kind = None;
            }
            TaskUpdate::Failed { kind, message } => {
                task.result = None;
                task.error = Some(message);
                task.error_kind = Some(kind);
            }
        }
        task.state = target;
        task.updated_at = Utc::now().max(task.updated_at);

        Ok(task.clone())
    }

    /// Snapshot of task `id`
    pub async fn get(&self, id: TaskId) -> Result<Task> {
        let inner = self.inner.read().await;
        inner
            .tasks
            .get(&id)
            .map(|e| e.task.clone())
            .ok_or_else(|| TaskError::NotFound { id }.into())
    }

    /// Remove task `id`; refused while it is `InProgress`
    pub async fn delete(&self, id: TaskId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let entry = inner.tasks.get(&id).ok_or(TaskError::NotFound { id })?;

        if entry.task.state == TaskState::InProgress {
            return Err(TaskError::InvalidState {
                id,
                operation: "delete".to_string(),
                current_state: entry.task.state,
            }
            .into());
        }

        inner.tasks.remove(&id);
        Ok(())
    }

    /// Task summaries in creation order, optionally restricted to one state
    pub async fn list(&self, filter: Option<TaskState>) -> Vec<TaskSummary> {
        let inner = self.inner.read().await;
        let mut entries: Vec<&Entry> = inner
            .tasks
            .values()
            .filter(|e| filter.is_none_or(|state| e.task.state == state))
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| TaskSummary::from(&e.task)).collect()
    }

    /// Number of tasks currently in `state`
    pub async fn count(&self, state: TaskState) -> usize {
        let inner = self.inner.read().await;
        inner
            .tasks
            .values()
            .filter(|e| e.task.state == state)
            .count()
    }

    /// Total number of tasks
    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    /// Whether the registry holds no tasks
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tasks.is_empty()
    }
}
