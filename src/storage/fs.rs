//! Directory-backed object store

use super::ObjectStore;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Object store keeping each bucket as a directory under `root`
///
/// Objects are plain files at `root/bucket/key`. Keys may contain `/` but
/// never `..` or absolute components.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root` (created lazily on first upload)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let uri = || format!("file://{}/{}", bucket, key);

        for part in [Path::new(bucket), Path::new(key)] {
            let safe = part
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !safe || part.as_os_str().is_empty() {
                return Err(StorageError::InvalidReference(uri()).into());
            }
        }

        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn scheme(&self) -> &'static str {
        "file"
    }

    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let target = self.object_path(bucket, key)?;
        let fail = |e: std::io::Error| StorageError::UploadFailed {
            path: path.to_path_buf(),
            uri: format!("file://{}/{}", bucket, key),
            reason: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
        }
        tokio::fs::copy(path, &target).await.map_err(fail)?;
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let source = self.object_path(bucket, key)?;
        let uri = format!("file://{}/{}", bucket, key);

        match tokio::fs::copy(&source, dest).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound { uri }.into())
            }
            Err(e) => Err(StorageError::DownloadFailed {
                uri,
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let target = self.object_path(bucket, key)?;
        let uri = format!("file://{}/{}", bucket, key);

        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound { uri }.into())
            }
            Err(e) => Err(StorageError::DeleteFailed {
                uri,
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let target = self.object_path(bucket, key)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }
}
