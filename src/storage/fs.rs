//! Filesystem-backed store.
//!
//! Serves a local directory laid out exactly like the bucket:
//! `manifests/{build}.json` and `blobs/{hash}{ext}`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::fs;

use crate::storage::{manifest_key, Blob, BlobStore, ManifestStore, StoreError};

/// Store reading objects from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage key onto a path under the root.
    /// Only plain relative keys are accepted.
    fn object_path(&self, key: &str) -> Option<PathBuf> {
        let key = Path::new(key);
        let mut path = self.root.clone();
        let mut has_component = false;
        for component in key.components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    has_component = true;
                }
                _ => return None,
            }
        }
        has_component.then_some(path)
    }

    async fn read_object(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let Some(path) = self.object_path(key) else {
            tracing::debug!(key = %key, "Rejected non-relative storage key");
            return Ok(None);
        };

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                // A directory where a file is expected is just a missing object.
                let is_dir = fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false);
                if is_dir {
                    Ok(None)
                } else {
                    Err(StoreError::Io(e))
                }
            }
        }
    }
}

#[async_trait]
impl ManifestStore for FsStore {
    async fn get_manifest(&self, build_id: &str) -> Result<Option<Bytes>, StoreError> {
        match manifest_key(build_id) {
            Some(key) => self.read_object(&key).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn get_blob(&self, blob_key: &str) -> Result<Option<Blob>, StoreError> {
        let content_type = mime_guess::from_path(blob_key)
            .first_raw()
            .map(str::to_string);
        Ok(self
            .read_object(blob_key)
            .await?
            .map(|bytes| Blob::new(bytes, content_type)))
    }
}
