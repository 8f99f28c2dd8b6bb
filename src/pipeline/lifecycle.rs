//! Health reporting and shutdown coordination.

use crate::error::Result;
use crate::types::{Event, HealthInfo, TaskState};
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::VideoAnalyzer;

/// How long shutdown waits for cancelled tasks to record their outcome
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

impl VideoAnalyzer {
    /// Liveness snapshot with the number of running tasks
    pub async fn health(&self) -> HealthInfo {
        HealthInfo {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
            active_tasks: self.registry.count(TaskState::InProgress).await,
            storage_enabled: self.storage.is_enabled(),
            storage_bucket: self.storage.bucket().map(str::to_string),
        }
    }

    /// Whether [`submit`](Self::submit) still accepts work
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the analyzer
    ///
    /// 1. Stops accepting new tasks
    /// 2. Cancels in-flight acquisition and polling (those tasks end `Failed`
    ///    with kind `cancelled`)
    /// 3. Waits up to 30 seconds for running tasks to reach a terminal state
    /// 4. Emits [`Event::Shutdown`]
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new tasks");

        self.shutdown.cancel();

        match tokio::time::timeout(SHUTDOWN_GRACE, self.wait_for_active_tasks()).await {
            Ok(()) => tracing::info!("All running tasks finished"),
            Err(_) => tracing::warn!("Timeout waiting for running tasks, proceeding with shutdown"),
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_active_tasks(&self) {
        loop {
            let active = self.registry.count(TaskState::InProgress).await
                + self.registry.count(TaskState::Starting).await;
            if active == 0 {
                return;
            }

            tracing::debug!(active, "Waiting for running tasks to finish");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
