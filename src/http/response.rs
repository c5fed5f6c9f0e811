//! Blob responses.
//!
//! # Responsibilities
//! - Answer a matching `If-None-Match` with 304 before touching the blob store
//! - Fetch the blob and attach content type, immutable caching, ETag, length
//!   and CORS headers
//! - Report a manifest entry whose blob is gone as a 500, never substitute
//!
//! # Design Decisions
//! - The blob key is the entity tag; blob keys are content addresses so the
//!   tag can never go stale
//! - HEAD takes `Content-Length` from the manifest entry and sends no body

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};

use crate::error::RouterError;
use crate::http::cors;
use crate::manifest::ManifestEntry;
use crate::observability::metrics;
use crate::resilience::timeouts::with_timeout;
use crate::storage::BlobStore;

/// Cache directive for content-addressed responses.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Content type when the store has none on record.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Serves manifest entries out of a blob store.
#[derive(Clone)]
pub struct ResponseBuilder {
    blobs: std::sync::Arc<dyn BlobStore>,
    fetch_timeout: Duration,
}

impl ResponseBuilder {
    pub fn new(blobs: std::sync::Arc<dyn BlobStore>, fetch_timeout: Duration) -> Self {
        Self {
            blobs,
            fetch_timeout,
        }
    }

    /// Response for `entry`, honoring the request's `If-None-Match`.
    pub async fn serve(
        &self,
        entry: &ManifestEntry,
        request_headers: &HeaderMap,
        head: bool,
    ) -> Result<Response<Body>, RouterError> {
        if crate::http::request::if_none_match(request_headers) == Some(entry.blob_key.as_str()) {
            return not_modified(entry);
        }

        let fetched = with_timeout(self.fetch_timeout, self.blobs.get_blob(&entry.blob_key)).await;
        metrics::record_store_fetch("blob", &fetched);

        let Some(blob) = fetched? else {
            tracing::error!(
                blob_key = %entry.blob_key,
                "Manifest entry points at a blob the store does not have"
            );
            return Err(RouterError::BlobMissing(entry.blob_key.clone()));
        };

        if blob.len() as u64 != entry.size {
            tracing::warn!(
                blob_key = %entry.blob_key,
                manifest_size = entry.size,
                blob_size = blob.len(),
                "Blob size differs from manifest"
            );
        }

        let content_type = blob
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

        let (content_length, body) = if head {
            (entry.size, Body::empty())
        } else {
            (blob.len() as u64, Body::from(blob.bytes))
        };

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, content_length)
            .body(body)?;
        content_headers(response.headers_mut(), entry)?;
        Ok(response)
    }
}

/// 304: validators and caching headers, no body, no length.
fn not_modified(entry: &ManifestEntry) -> Result<Response<Body>, RouterError> {
    let mut response = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .body(Body::empty())?;
    content_headers(response.headers_mut(), entry)?;
    Ok(response)
}

fn content_headers(headers: &mut HeaderMap, entry: &ManifestEntry) -> Result<(), RouterError> {
    let etag = HeaderValue::from_str(&entry.blob_key).map_err(axum::http::Error::from)?;
    headers.insert(header::ETAG, etag);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
    );
    cors::apply(headers);
    Ok(())
}
