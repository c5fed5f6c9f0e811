//! HTTP-origin store.
//!
//! # Responsibilities
//! - Fetch manifests and blobs from an origin that exposes the bucket over HTTP
//!   (public R2/S3 endpoint, static file host, another router)
//! - Map 404 to absence and any other failure to `StoreError::Unavailable`
//! - Carry the origin's `Content-Type` through as blob metadata
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` per store
//! - No retries here; deadlines are applied by the caller

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use url::Url;

use crate::storage::{manifest_key, Blob, BlobStore, ManifestStore, StoreError};

/// Store fetching objects relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    /// Create a store rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let mut base_url: Url = base_url
            .parse()
            .map_err(|e| StoreError::Unavailable(format!("Invalid base URL '{}': {}", base_url, e)))?;
        // Url::join replaces the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn object_url(&self, key: &str) -> Option<Url> {
        // Leading '/', a scheme or dot segments would escape the base.
        if key.is_empty()
            || key.starts_with('/')
            || key.contains("://")
            || key.split('/').any(|segment| segment == "..")
        {
            return None;
        }
        self.base_url.join(key).ok()
    }

    async fn fetch(&self, key: &str) -> Result<Option<(Bytes, Option<String>)>, StoreError> {
        let Some(url) = self.object_url(key) else {
            return Ok(None);
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("GET {}: {}", url, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| StoreError::Unavailable(format!("GET {}: {}", url, e)))?;
                Ok(Some((bytes, content_type)))
            }
            status => Err(StoreError::Unavailable(format!("GET {} returned {}", url, status))),
        }
    }
}

#[async_trait]
impl ManifestStore for HttpStore {
    async fn get_manifest(&self, build_id: &str) -> Result<Option<Bytes>, StoreError> {
        let Some(key) = manifest_key(build_id) else {
            return Ok(None);
        };
        Ok(self.fetch(&key).await?.map(|(bytes, _)| bytes))
    }
}

#[async_trait]
impl BlobStore for HttpStore {
    async fn get_blob(&self, blob_key: &str) -> Result<Option<Blob>, StoreError> {
        Ok(self
            .fetch(blob_key)
            .await?
            .map(|(bytes, content_type)| Blob::new(bytes, content_type)))
    }
}
