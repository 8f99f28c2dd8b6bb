//! Optional staging of artifacts through object storage
//!
//! [`StorageAdapter`] is the only type the pipeline talks to. When staging is
//! disabled it is an identity: [`StorageAdapter::stage`] hands back the local
//! path and [`StorageAdapter::discard`] does nothing. When enabled it uploads
//! to `videos/{task_id}/{file}` in the configured bucket through an
//! [`ObjectStore`] backend:
//!
//! - [`GcsObjectStore`]: Google Cloud Storage JSON API over HTTP
//! - [`FsObjectStore`]: buckets as directories, for single-host deployments and tests

mod fs;
mod gcs;

pub use fs::FsObjectStore;
pub use gcs::GcsObjectStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Object store backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// URI scheme of references produced by this store (e.g. `gs`)
    fn scheme(&self) -> &'static str;

    /// Upload a local file to `bucket/key`
    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;

    /// Download `bucket/key` to a local file
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;

    /// Delete `bucket/key`
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Check if `bucket/key` exists
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;
}

/// Location of a staged object, written as `scheme://bucket/key`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobRef {
    /// URI scheme of the store that holds the object
    pub scheme: String,
    /// Bucket name
    pub bucket: String,
    /// Object key inside the bucket
    pub key: String,
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

impl std::str::FromStr for BlobRef {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StorageError::InvalidReference(s.to_string());

        let (scheme, rest) = s.split_once("://").ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        if scheme.is_empty() || bucket.is_empty() || key.is_empty() {
            return Err(invalid().into());
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

/// What [`StorageAdapter::stage`] returns
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredRef {
    /// Staging disabled or skipped; the artifact stays on local disk
    Local(PathBuf),
    /// The artifact was uploaded
    Remote(BlobRef),
}

impl StoredRef {
    /// Whether this reference points into object storage
    pub fn is_remote(&self) -> bool {
        matches!(self, StoredRef::Remote(_))
    }
}

impl std::fmt::Display for StoredRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoredRef::Local(path) => write!(f, "{}", path.display()),
            StoredRef::Remote(blob) => write!(f, "{}", blob),
        }
    }
}

/// Staging facade used by the pipeline
#[derive(Clone)]
pub struct StorageAdapter {
    backend: Option<Arc<dyn ObjectStore>>,
    bucket: String,
}

impl StorageAdapter {
    /// Adapter that stages into `bucket` on `store`
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            backend: Some(store),
            bucket: bucket.into(),
        }
    }

    /// Adapter with staging turned off
    pub fn disabled() -> Self {
        Self {
            backend: None,
            bucket: String::new(),
        }
    }

    /// Build the adapter described by `config`
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let store: Arc<dyn ObjectStore> = match config.backend {
            StorageBackend::Gcs => Arc::new(GcsObjectStore::new(
                config.endpoint.clone(),
                config.project.clone(),
                config.access_token.clone(),
            )?),
            StorageBackend::Filesystem => Arc::new(FsObjectStore::new(config.root.clone())),
        };

        tracing::info!(
            backend = ?config.backend,
            bucket = %config.bucket,
            "object storage staging enabled"
        );
        Ok(Self::new(store, config.bucket.clone()))
    }

    /// Whether staging is active
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Staging bucket, when enabled
    pub fn bucket(&self) -> Option<&str> {
        self.backend.as_ref().map(|_| self.bucket.as_str())
    }

    /// Upload `local` under `key`; identity when disabled
    pub async fn stage(&self, local: &Path, key: &str) -> Result<StoredRef> {
        let Some(store) = &self.backend else {
            return Ok(StoredRef::Local(local.to_path_buf()));
        };

        store.upload(&self.bucket, key, local).await?;
        let blob = BlobRef {
            scheme: store.scheme().to_string(),
            bucket: self.bucket.clone(),
            key: key.to_string(),
        };
        tracing::info!(reference = %blob, "artifact staged");
        Ok(StoredRef::Remote(blob))
    }

    /// Materialize `reference` as a local file
    ///
    /// A local reference is returned unchanged; a remote one is downloaded to
    /// `dest` and `dest` is returned.
    pub async fn fetch(&self, reference: &StoredRef, dest: &Path) -> Result<PathBuf> {
        match reference {
            StoredRef::Local(path) => Ok(path.clone()),
            StoredRef::Remote(blob) => {
                let store = self.store_for(blob)?;
                store.download(&blob.bucket, &blob.key, dest).await?;
                Ok(dest.to_path_buf())
            }
        }
    }

    /// Delete a staged object; never fails
    ///
    /// Local references are ignored. Deletion errors are logged and swallowed.
    pub async fn discard(&self, reference: &StoredRef) {
        let StoredRef::Remote(blob) = reference else {
            return;
        };

        let result = match self.store_for(blob) {
            Ok(store) => store.delete(&blob.bucket, &blob.key).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => tracing::debug!(reference = %blob, "staged object deleted"),
            Err(e) => tracing::warn!(
                reference = %blob,
                error = %e,
                "failed to delete staged object"
            ),
        }
    }

    /// Check whether `reference` still resolves
    pub async fn exists(&self, reference: &StoredRef) -> Result<bool> {
        match reference {
            StoredRef::Local(path) => Ok(tokio::fs::try_exists(path).await?),
            StoredRef::Remote(blob) => {
                let store = self.store_for(blob)?;
                store.exists(&blob.bucket, &blob.key).await
            }
        }
    }

    fn store_for(&self, blob: &BlobRef) -> Result<&Arc<dyn ObjectStore>> {
        let store = self.backend.as_ref().ok_or(StorageError::Disabled)?;
        if store.scheme() != blob.scheme {
            return Err(StorageError::InvalidReference(blob.to_string()).into());
        }
        Ok(store)
    }
}

/// Staging key for a task's artifact
pub fn staging_key(task_id: &crate::types::TaskId, file_name: &str) -> String {
    format!("videos/{}/{}", task_id, file_name)
}
