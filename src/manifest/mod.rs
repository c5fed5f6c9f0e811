//! Build manifests.
//!
//! # Data Flow
//! ```text
//! ManifestStore (raw JSON)
//!     → Manifest::from_slice (parse, reject malformed)
//!     → cache.rs (per-build record, 60s TTL)
//!     → routing::rules (path → entry)
//! ```
//!
//! A manifest maps a canonical request path (always starting with `/`) to the
//! blob that was built for it. Manifests are produced by the publish step and
//! never mutated here.

pub mod cache;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use cache::{Clock, ManifestCache, ManualClock, SystemClock, MANIFEST_TTL};

/// One served file of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Identifies the bytes.
    #[serde(rename = "hash", alias = "contentHash")]
    pub content_hash: String,

    /// Storage key the bytes are fetched from. Doubles as the entity tag.
    #[serde(rename = "blob", alias = "blobKey")]
    pub blob_key: String,

    /// Byte length of the blob.
    pub size: u64,
}

impl ManifestEntry {
    pub fn new(content_hash: impl Into<String>, blob_key: impl Into<String>, size: u64) -> Self {
        Self {
            content_hash: content_hash.into(),
            blob_key: blob_key.into(),
            size,
        }
    }
}

/// Path → entry mapping for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: HashMap<String, ManifestEntry>,
}

impl Manifest {
    /// Parse a manifest document.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes.
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ManifestEntry)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, ManifestEntry)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, ManifestEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
