//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request
//!     → RequestKind::classify (method)
//!         Preflight   → cors::preflight()
//!         Unsupported → 405
//!         Fetch       ↓
//!     → TenantResolver (host → build id)
//!     → ManifestCache (build id → manifest)      404 "Site not found: {id}"
//!     → routing::rules (path → entry)            404 "Not found"
//!     → ResponseBuilder (entry → blob response)  500 "Blob not found"
//! ```
//!
//! Stateless per request; the manifest cache is the only state shared
//! between requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{Request, Response};
use axum::response::IntoResponse;

use crate::error::RouterError;
use crate::http::cors;
use crate::http::request::{request_host, request_id, RequestKind};
use crate::http::response::ResponseBuilder;
use crate::manifest::{Clock, ManifestCache, SystemClock};
use crate::observability::metrics;
use crate::routing::{resolve_with_rule, TenantResolver};
use crate::storage::Storage;

/// Top-level request handler composing tenant, manifest, path and blob steps.
pub struct Dispatcher {
    tenants: Arc<ArcSwap<TenantResolver>>,
    manifests: ManifestCache,
    responses: ResponseBuilder,
}

impl Dispatcher {
    pub fn new(tenants: TenantResolver, storage: Storage, store_timeout: Duration) -> Self {
        Self::with_clock(tenants, storage, store_timeout, Arc::new(SystemClock))
    }

    /// Construct with an explicit clock for the manifest cache.
    pub fn with_clock(
        tenants: TenantResolver,
        storage: Storage,
        store_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tenants: Arc::new(ArcSwap::from_pointee(tenants)),
            manifests: ManifestCache::new(storage.manifests, clock, store_timeout),
            responses: ResponseBuilder::new(storage.blobs, store_timeout),
        }
    }

    /// Handle for swapping the tenant resolver on config reload.
    pub fn tenants(&self) -> Arc<ArcSwap<TenantResolver>> {
        Arc::clone(&self.tenants)
    }

    pub fn manifest_cache(&self) -> &ManifestCache {
        &self.manifests
    }

    /// Produce the response for one request.
    ///
    /// Only the request head is needed; the body is dropped before any await.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let (parts, _body) = request.into_parts();

        let response = match RequestKind::classify(&parts.method) {
            RequestKind::Preflight => cors::preflight(),
            RequestKind::Unsupported => cors::method_not_allowed(),
            RequestKind::Fetch { head } => match self.fetch(&parts, head).await {
                Ok(response) => response,
                Err(err) => {
                    log_failure(request_id(&parts.headers), parts.uri.path(), &err);
                    err.into_response()
                }
            },
        };

        metrics::record_request(parts.method.as_str(), response.status().as_u16(), start);
        response
    }

    async fn fetch(&self, parts: &Parts, head: bool) -> Result<Response<Body>, RouterError> {
        let build_id = self.tenants.load().resolve(request_host(parts));
        let path = parts.uri.path();

        let manifest = self.manifests.get(&build_id).await?;
        let resolution = resolve_with_rule(path, &manifest)
            .ok_or_else(|| RouterError::PathNotFound(path.to_string()))?;

        tracing::debug!(
            request_id = %request_id(&parts.headers),
            build_id = %build_id,
            path = %path,
            rule = %resolution.rule,
            blob_key = %resolution.entry.blob_key,
            "Resolved request"
        );

        self.responses
            .serve(resolution.entry, &parts.headers, head)
            .await
    }
}

fn log_failure(request_id: &str, path: &str, err: &RouterError) {
    match err {
        RouterError::PathNotFound(_) | RouterError::BuildNotFound(_) => {
            tracing::debug!(request_id = %request_id, path = %path, error = %err, "Not found");
        }
        RouterError::ManifestMalformed { build_id, .. } => {
            tracing::error!(
                request_id = %request_id,
                build_id = %build_id,
                error = %err,
                "Upstream data-integrity defect: manifest does not parse"
            );
        }
        RouterError::BlobMissing(_) | RouterError::Store(_) | RouterError::Http(_) => {
            tracing::error!(request_id = %request_id, path = %path, error = %err, "Request failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Manifest, ManifestEntry, ManualClock, MANIFEST_TTL};
    use crate::storage::MemoryStore;
    use axum::http::{header, Method, StatusCode};

    fn dispatcher(store: &MemoryStore, clock: Arc<ManualClock>) -> Dispatcher {
        Dispatcher::with_clock(
            TenantResolver::new("site.example"),
            Storage::shared(store.clone()),
            Duration::from_secs(5),
            clock,
        )
    }

    fn get(host: &str, path: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    async fn text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn publish_main(store: &MemoryStore) {
        let manifest: Manifest = [("/".to_string(), ManifestEntry::new("h1", "blobs/h1.html", 5))]
            .into_iter()
            .collect();
        store.put_manifest("main", &manifest);
        store.put_blob("blobs/h1.html", "hello", Some("text/html"));
    }

    #[tokio::test]
    async fn test_serves_production_root() {
        let store = MemoryStore::new();
        publish_main(&store);
        let d = dispatcher(&store, Arc::new(ManualClock::new()));

        let response = d.handle(get("www.site.example", "/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "hello");
    }

    #[tokio::test]
    async fn test_unknown_build() {
        let store = MemoryStore::new();
        let d = dispatcher(&store, Arc::new(ManualClock::new()));

        let response = d.handle(get("pr-99.site.example", "/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Site not found: pr-99");
    }

    #[tokio::test]
    async fn test_malformed_manifest_reported_as_missing_site() {
        let store = MemoryStore::new();
        store.put_manifest_raw("pr-4", "[1, 2, 3]");
        let d = dispatcher(&store, Arc::new(ManualClock::new()));

        let response = d.handle(get("pr-4.site.example", "/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Site not found: pr-4");
    }

    #[tokio::test]
    async fn test_manifest_cached_across_requests() {
        let store = MemoryStore::new();
        publish_main(&store);
        let clock = Arc::new(ManualClock::new());
        let d = dispatcher(&store, clock.clone());

        for _ in 0..5 {
            d.handle(get("site.example", "/")).await;
        }
        assert_eq!(store.manifest_reads(), 1);

        clock.advance(MANIFEST_TTL);
        d.handle(get("site.example", "/")).await;
        assert_eq!(store.manifest_reads(), 2);
    }

    #[tokio::test]
    async fn test_reload_swaps_tenant_resolver() {
        let store = MemoryStore::new();
        publish_main(&store);
        let d = dispatcher(&store, Arc::new(ManualClock::new()));

        // "docs" is a build label under site.example, and no such build exists
        let before = d.handle(get("docs.site.example", "/")).await;
        assert_eq!(before.status(), StatusCode::NOT_FOUND);

        d.tenants().store(Arc::new(TenantResolver::new("docs.site.example")));
        let after = d.handle(get("docs.site.example", "/")).await;
        assert_eq!(after.status(), StatusCode::OK);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_handle_future_is_send() {
        let store = MemoryStore::new();
        let d = dispatcher(&store, Arc::new(ManualClock::new()));
        let fut = d.handle(get("site.example", "/"));
        assert_send(&fut);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let store = MemoryStore::new();
        publish_main(&store);
        let d = dispatcher(&store, Arc::new(ManualClock::new()));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::HOST, "site.example")
            .body(Body::empty())
            .unwrap();
        let response = d.handle(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(store.manifest_reads(), 0);
    }
}
