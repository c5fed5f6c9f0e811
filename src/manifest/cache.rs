//! Process-local manifest cache.
//!
//! # Responsibilities
//! - Serve a build's manifest from memory while its record is younger than the TTL
//! - Re-fetch from the manifest store on miss or expiry
//! - Never cache absence (a build may be published right after a miss)
//!
//! # Design Decisions
//! - Records hold `Arc<Manifest>`; a refresh replaces the record in one insert,
//!   so readers see either the old or the new manifest, never a partial one
//! - Concurrent misses for one build may both fetch; last write wins
//! - Time comes from an injected `Clock` so expiry is testable without sleeping

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::RouterError;
use crate::manifest::Manifest;
use crate::observability::metrics;
use crate::resilience::timeouts::with_timeout;
use crate::storage::ManifestStore;

/// How long a fetched manifest is served without asking the store again.
pub const MANIFEST_TTL: Duration = Duration::from_secs(60);

/// Source of monotonic time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone)]
struct CacheRecord {
    manifest: Arc<Manifest>,
    expires_at: Instant,
}

/// TTL cache in front of a `ManifestStore`.
pub struct ManifestCache {
    store: Arc<dyn ManifestStore>,
    clock: Arc<dyn Clock>,
    records: DashMap<String, CacheRecord>,
    fetch_timeout: Duration,
}

impl ManifestCache {
    pub fn new(store: Arc<dyn ManifestStore>, clock: Arc<dyn Clock>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            records: DashMap::new(),
            fetch_timeout,
        }
    }

    /// Manifest for `build_id`, from memory when fresh, otherwise from the store.
    pub async fn get(&self, build_id: &str) -> Result<Arc<Manifest>, RouterError> {
        let now = self.clock.now();
        let cached = self
            .records
            .get(build_id)
            .filter(|record| now < record.expires_at)
            .map(|record| Arc::clone(&record.manifest));

        if let Some(manifest) = cached {
            metrics::record_manifest_lookup("hit");
            return Ok(manifest);
        }
        metrics::record_manifest_lookup("miss");

        let fetched = with_timeout(self.fetch_timeout, self.store.get_manifest(build_id)).await;
        metrics::record_store_fetch("manifest", &fetched);

        let raw = match fetched? {
            Some(raw) => raw,
            None => {
                // Build retired since it was cached; drop the stale record.
                self.records.remove(build_id);
                return Err(RouterError::BuildNotFound(build_id.to_string()));
            }
        };

        let manifest = Manifest::from_slice(&raw).map_err(|source| RouterError::ManifestMalformed {
            build_id: build_id.to_string(),
            source,
        })?;
        let manifest = Arc::new(manifest);

        self.records.insert(
            build_id.to_string(),
            CacheRecord {
                manifest: Arc::clone(&manifest),
                expires_at: self.clock.now() + MANIFEST_TTL,
            },
        );

        tracing::debug!(build_id = %build_id, entries = manifest.len(), "Manifest cached");
        Ok(manifest)
    }

    /// Number of builds currently held (fresh or expired).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;
    use crate::storage::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use axum::body::Bytes;

    fn sample_manifest() -> Manifest {
        [("/".to_string(), ManifestEntry::new("h1", "blobs/h1.html", 10))]
            .into_iter()
            .collect()
    }

    fn cache_with(store: &MemoryStore, clock: &Arc<ManualClock>) -> ManifestCache {
        ManifestCache::new(
            Arc::new(store.clone()),
            clock.clone(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let store = MemoryStore::new();
        store.put_manifest("main", &sample_manifest());
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with(&store, &clock);

        cache.get("main").await.unwrap();
        assert_eq!(store.manifest_reads(), 1);

        clock.advance(MANIFEST_TTL - Duration::from_millis(1));
        let manifest = cache.get("main").await.unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(store.manifest_reads(), 1);
    }

    #[tokio::test]
    async fn test_refetch_after_ttl() {
        let store = MemoryStore::new();
        store.put_manifest("main", &sample_manifest());
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with(&store, &clock);

        cache.get("main").await.unwrap();
        clock.advance(MANIFEST_TTL + Duration::from_millis(1));
        cache.get("main").await.unwrap();
        assert_eq!(store.manifest_reads(), 2);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_republished_build() {
        let store = MemoryStore::new();
        store.put_manifest("pr-3", &sample_manifest());
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with(&store, &clock);

        assert!(cache.get("pr-3").await.unwrap().get("/about").is_none());

        let updated: Manifest = [
            ("/".to_string(), ManifestEntry::new("h1", "blobs/h1.html", 10)),
            ("/about".to_string(), ManifestEntry::new("h2", "blobs/h2.html", 20)),
        ]
        .into_iter()
        .collect();
        store.put_manifest("pr-3", &updated);

        // Still the cached copy inside the window
        assert!(cache.get("pr-3").await.unwrap().get("/about").is_none());

        clock.advance(MANIFEST_TTL);
        assert!(cache.get("pr-3").await.unwrap().get("/about").is_some());
    }

    #[tokio::test]
    async fn test_absence_is_not_cached() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with(&store, &clock);

        let err = cache.get("pr-8").await.unwrap_err();
        assert!(matches!(err, RouterError::BuildNotFound(ref id) if id == "pr-8"));
        assert!(cache.is_empty());

        store.put_manifest("pr-8", &sample_manifest());
        assert!(cache.get("pr-8").await.is_ok());
        assert_eq!(store.manifest_reads(), 2);
    }

    #[tokio::test]
    async fn test_expired_record_dropped_when_build_retired() {
        let store = MemoryStore::new();
        store.put_manifest("pr-5", &sample_manifest());
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with(&store, &clock);

        cache.get("pr-5").await.unwrap();
        store.remove_manifest("pr-5");
        clock.advance(MANIFEST_TTL);

        assert!(matches!(cache.get("pr-5").await, Err(RouterError::BuildNotFound(_))));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_an_error() {
        let store = MemoryStore::new();
        store.put_manifest_raw("main", "{not json");
        let clock = Arc::new(ManualClock::new());
        let cache = cache_with(&store, &clock);

        let err = cache.get("main").await.unwrap_err();
        assert!(matches!(err, RouterError::ManifestMalformed { ref build_id, .. } if build_id == "main"));
        assert!(cache.is_empty());
    }

    struct StalledStore;

    #[async_trait]
    impl ManifestStore for StalledStore {
        async fn get_manifest(&self, _build_id: &str) -> Result<Option<Bytes>, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_surfaces_as_store_error() {
        let cache = ManifestCache::new(
            Arc::new(StalledStore),
            Arc::new(SystemClock),
            Duration::from_secs(2),
        );

        let err = cache.get("main").await.unwrap_err();
        assert!(matches!(err, RouterError::Store(StoreError::Timeout(_))));
    }
}
