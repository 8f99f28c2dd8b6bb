//! Private per-task working directory

use crate::error::{Error, Result};
use crate::types::TaskId;
use std::path::{Path, PathBuf};

/// A task's private directory, removed on every exit path
///
/// Call [`Workspace::release`] on the normal path so removal errors are
/// logged; dropping an unreleased workspace (panic, aborted task) removes it
/// synchronously.
#[derive(Debug)]
pub(crate) struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create `parent/task_{id}`, owner-only on Unix
    ///
    /// Fails if the directory already exists, so a new workspace is always
    /// empty.
    pub(crate) async fn create(parent: &Path, id: TaskId) -> Result<Self> {
        let path = parent.join(format!("task_{}", id));

        tokio::fs::create_dir_all(parent).await?;

        let mut builder = tokio::fs::DirBuilder::new();
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create workspace '{}': {}", path.display(), e),
            ))
        })?;

        tracing::debug!(task_id = %id, path = %path.display(), "workspace created");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory recursively; failures are logged only
    pub(crate) async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
