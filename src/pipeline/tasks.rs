//! Task submission, inspection and deletion.

use crate::error::{Error, Result};
use crate::types::{Event, Task, TaskId, TaskState, TaskSummary};
use std::sync::atomic::Ordering;

use super::VideoAnalyzer;

impl VideoAnalyzer {
    /// Create a task for `locator` and start its run in the background
    ///
    /// Returns as soon as the task exists; the run is not awaited. The
    /// locator is checked by the run itself, so a malformed one still
    /// yields a task that ends `Failed` with `validation_error`.
    ///
    /// # Errors
    ///
    /// [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has been called.
    pub async fn submit(&self, locator: impl Into<String>) -> Result<TaskId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let task = self.registry.create(locator).await;
        let id = task.id;

        tracing::info!(task_id = %id, locator = %task.source_locator, "task created");
        self.emit_event(Event::Queued {
            id,
            locator: task.source_locator.clone(),
        });

        let analyzer = self.clone();
        tokio::spawn(async move {
            analyzer.run_task(id, task.source_locator).await;
        });

        Ok(id)
    }

    /// Current record of task `id`
    pub async fn task(&self, id: TaskId) -> Result<Task> {
        self.registry.get(id).await
    }

    /// Remove task `id`
    ///
    /// # Errors
    ///
    /// `TaskError::NotFound` for an unknown id, `TaskError::InvalidState` while
    /// the task is `InProgress`.
    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        self.registry.delete(id).await?;
        tracing::info!(task_id = %id, "task deleted");
        self.emit_event(Event::Removed { id });
        Ok(())
    }

    /// Task summaries in creation order, optionally restricted to one state
    pub async fn list_tasks(&self, status: Option<TaskState>) -> Vec<TaskSummary> {
        self.registry.list(status).await
    }
}
