//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! build id ──▶ manifest_key() ──▶ ManifestStore ──▶ raw manifest bytes
//! blob key ─────────────────────▶ BlobStore ──────▶ Blob { bytes, content_type }
//!
//! Backends:
//!     fs.rs      (local directory mirroring the bucket)
//!     http.rs    (HTTP origin exposing the bucket, via reqwest)
//!     memory.rs  (in-process, tests and embedding)
//! ```
//!
//! # Design Decisions
//! - Both stores are read-only from the router's side
//! - Absence is `Ok(None)`, never an error; errors mean the store itself failed
//! - Manifests and blobs share one bucket, so every backend implements both traits

pub mod fs;
pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

use crate::config::schema::StorageConfig;

pub use fs::FsStore;
pub use http::HttpStore;
pub use memory::MemoryStore;

/// Key prefix under which per-build manifests live.
pub const MANIFEST_PREFIX: &str = "manifests/";

/// Errors raised by a store that could not answer at all.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or answered with an unexpected status.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Fetch did not complete within the configured deadline.
    #[error("store fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Local I/O failure other than not-found.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes of one immutable blob plus the metadata stored alongside it.
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Key→JSON storage holding one manifest document per build.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Fetch the raw manifest document for `build_id`, if one exists.
    async fn get_manifest(&self, build_id: &str) -> Result<Option<Bytes>, StoreError>;
}

/// Content-addressed, write-once blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the blob stored under `blob_key`, if one exists.
    async fn get_blob(&self, blob_key: &str) -> Result<Option<Blob>, StoreError>;
}

/// Storage key of the manifest for `build_id`.
///
/// Returns `None` when the build id cannot name a single object (path
/// separators, dot segments), so hostile host labels never reach a backend.
pub fn manifest_key(build_id: &str) -> Option<String> {
    if build_id.is_empty()
        || build_id == "."
        || build_id == ".."
        || build_id.contains(['/', '\\'])
    {
        return None;
    }
    Some(format!("{MANIFEST_PREFIX}{build_id}.json"))
}

/// The pair of stores the router reads from.
#[derive(Clone)]
pub struct Storage {
    pub manifests: Arc<dyn ManifestStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Storage {
    /// Use one backend for both manifests and blobs.
    pub fn shared<S>(store: S) -> Self
    where
        S: ManifestStore + BlobStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            manifests: store.clone(),
            blobs: store,
        }
    }

    /// Build the configured backend.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        match config {
            StorageConfig::Filesystem { root } => {
                tracing::info!(root = %root.display(), "Using filesystem storage");
                Ok(Self::shared(FsStore::new(root)))
            }
            StorageConfig::Http { base_url } => {
                tracing::info!(base_url = %base_url, "Using HTTP storage");
                Ok(Self::shared(HttpStore::new(base_url)?))
            }
        }
    }
}
