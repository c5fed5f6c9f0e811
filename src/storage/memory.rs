//! In-process store.
//!
//! Backed by a `DashMap` so tests and embedders can publish objects while the
//! router is serving. Counts reads so callers can assert on cache behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;

use crate::manifest::Manifest;
use crate::storage::{manifest_key, Blob, BlobStore, ManifestStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    objects: DashMap<String, Blob>,
    manifest_reads: AtomicUsize,
    blob_reads: AtomicUsize,
}

/// Shared, cloneable in-memory bucket.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw manifest document for `build_id`.
    pub fn put_manifest_raw(&self, build_id: &str, raw: impl Into<Bytes>) {
        if let Some(key) = manifest_key(build_id) {
            self.inner
                .objects
                .insert(key, Blob::new(raw, Some("application/json".to_string())));
        }
    }

    /// Serialize and store a manifest for `build_id`.
    pub fn put_manifest(&self, build_id: &str, manifest: &Manifest) {
        // Serializing a map of plain structs cannot fail.
        if let Ok(raw) = serde_json::to_vec(manifest) {
            self.put_manifest_raw(build_id, raw);
        }
    }

    pub fn remove_manifest(&self, build_id: &str) {
        if let Some(key) = manifest_key(build_id) {
            self.inner.objects.remove(&key);
        }
    }

    pub fn put_blob(&self, blob_key: &str, bytes: impl Into<Bytes>, content_type: Option<&str>) {
        self.inner.objects.insert(
            blob_key.to_string(),
            Blob::new(bytes, content_type.map(str::to_string)),
        );
    }

    /// Number of manifest reads served so far (hits and misses).
    pub fn manifest_reads(&self) -> usize {
        self.inner.manifest_reads.load(Ordering::SeqCst)
    }

    pub fn blob_reads(&self) -> usize {
        self.inner.blob_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManifestStore for MemoryStore {
    async fn get_manifest(&self, build_id: &str) -> Result<Option<Bytes>, StoreError> {
        self.inner.manifest_reads.fetch_add(1, Ordering::SeqCst);
        Ok(manifest_key(build_id)
            .and_then(|key| self.inner.objects.get(&key).map(|r| r.value().bytes.clone())))
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get_blob(&self, blob_key: &str) -> Result<Option<Blob>, StoreError> {
        self.inner.blob_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.objects.get(blob_key).map(|r| r.value().clone()))
    }
}
