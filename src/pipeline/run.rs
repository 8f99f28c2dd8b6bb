//! One end-to-end run per task.

use crate::analysis::AnalysisResult;
use crate::error::{Error, Result, TaskError};
use crate::storage::{StoredRef, staging_key};
use crate::types::{Event, TaskId, TaskUpdate};
use std::path::Path;

use super::VideoAnalyzer;
use super::validation::validate_locator;
use super::workspace::Workspace;

impl VideoAnalyzer {
    /// Drive task `id` from `Starting` to a terminal state
    ///
    /// Every failure is recorded on the task; nothing propagates to the
    /// caller, which does not await this.
    pub(crate) async fn run_task(&self, id: TaskId, locator: String) {
        if let Err(e) = validate_locator(&locator) {
            tracing::warn!(task_id = %id, error = %e, "rejected locator");
            self.finish(id, Err(e)).await;
            return;
        }

        if let Err(e) = self.registry.transition(id, TaskUpdate::InProgress).await {
            tracing::warn!(task_id = %id, error = %e, "task could not start");
            return;
        }
        tracing::info!(task_id = %id, "task started");

        let outcome = self.execute(id, &locator).await;
        self.finish(id, outcome).await;
    }

    /// Allocate the workspace, run the pipeline inside it, release it
    async fn execute(&self, id: TaskId, locator: &str) -> Result<AnalysisResult> {
        let workspace = Workspace::create(&self.config.work_dir, id).await?;
        let outcome = self.acquire_and_analyze(id, locator, workspace.path()).await;
        workspace.release().await;
        outcome
    }

    async fn acquire_and_analyze(
        &self,
        id: TaskId,
        locator: &str,
        workspace: &Path,
    ) -> Result<AnalysisResult> {
        self.emit_event(Event::Acquiring { id });

        let events = self.event_tx.clone();
        let mut acquired = self
            .chain
            .acquire(locator, workspace, &self.shutdown, |strategy, error| {
                events
                    .send(Event::StrategyFailed {
                        id,
                        strategy: strategy.name.clone(),
                        error: error.to_string(),
                    })
                    .ok();
            })
            .await?;

        let file_name = acquired.artifact.file_name();
        self.emit_event(Event::Acquired {
            id,
            strategy: acquired.strategy.clone(),
            file_name: file_name.clone(),
        });

        let key = staging_key(&id, &file_name);
        let reference = match self.storage.stage(&acquired.artifact.local_path, &key).await {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(
                    task_id = %id,
                    error = %e,
                    "staging failed, analyzing the local artifact instead"
                );
                StoredRef::Local(acquired.artifact.local_path.clone())
            }
        };

        if reference.is_remote() {
            acquired.artifact.remote_uri = Some(reference.to_string());
            self.emit_event(Event::Staged {
                id,
                reference: reference.to_string(),
            });
        }

        tracing::info!(task_id = %id, reference = %reference, "starting analysis");
        self.emit_event(Event::Analyzing { id });

        let result = self.analysis.analyze(&reference, &self.shutdown).await;
        self.storage.discard(&reference).await;

        result
    }

    /// Record the outcome; a task deleted meanwhile is only logged
    async fn finish(&self, id: TaskId, outcome: Result<AnalysisResult>) {
        let update = match outcome {
            Ok(result) => TaskUpdate::Completed(result),
            Err(e) => TaskUpdate::Failed {
                kind: e.failure_kind(),
                message: e.to_string(),
            },
        };

        match self.registry.transition(id, update).await {
            Ok(task) => match (task.error, task.error_kind) {
                (Some(error), Some(kind)) => {
                    tracing::error!(task_id = %id, kind = ?kind, error = %error, "task failed");
                    self.emit_event(Event::Failed { id, kind, error });
                }
                _ => {
                    tracing::info!(task_id = %id, "task completed");
                    self.emit_event(Event::Completed { id });
                }
            },
            Err(Error::Task(TaskError::NotFound { .. })) => {
                tracing::warn!(task_id = %id, "task removed before its outcome was recorded");
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "failed to record task outcome");
            }
        }
    }
}
