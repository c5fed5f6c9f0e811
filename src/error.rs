//! Request-level error taxonomy.
//!
//! Every failure is terminal for the request that hit it and maps to exactly
//! one HTTP status. Nothing here is retried by the router itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::storage::StoreError;

/// Errors that end a request.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No manifest published for the build id.
    #[error("no manifest for build {0}")]
    BuildNotFound(String),

    /// Store returned a manifest that does not parse. Upstream publish defect.
    #[error("manifest for build {build_id} is malformed: {source}")]
    ManifestMalformed {
        build_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Manifest exists but no resolution rule matched.
    #[error("no manifest entry for {0}")]
    PathNotFound(String),

    /// Manifest lists a blob the blob store does not have.
    #[error("blob {0} listed in manifest but missing from store")]
    BlobMissing(String),

    /// Store unreachable or timed out.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Response could not be assembled (e.g. a blob key that is not a valid header value).
    #[error("failed to build response: {0}")]
    Http(#[from] axum::http::Error),
}

impl RouterError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::BuildNotFound(_)
            | RouterError::ManifestMalformed { .. }
            | RouterError::PathNotFound(_) => StatusCode::NOT_FOUND,
            RouterError::BlobMissing(_) | RouterError::Store(_) | RouterError::Http(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Plain-text body shown to the client.
    pub fn public_message(&self) -> String {
        match self {
            RouterError::BuildNotFound(build_id)
            | RouterError::ManifestMalformed { build_id, .. } => {
                format!("Site not found: {}", build_id)
            }
            RouterError::PathNotFound(_) => "Not found".to_string(),
            RouterError::BlobMissing(_) => "Blob not found".to_string(),
            RouterError::Store(_) => "Storage unavailable".to_string(),
            RouterError::Http(_) => "Internal error".to_string(),
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RouterError::BuildNotFound("pr-1".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(RouterError::PathNotFound("/x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            RouterError::BlobMissing("blobs/a.html".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RouterError::Store(StoreError::Timeout(Duration::from_secs(5))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_malformed_manifest_looks_like_missing_site() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RouterError::ManifestMalformed {
            build_id: "pr-2".into(),
            source,
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Site not found: pr-2");
        // Diagnostics still say what went wrong
        assert!(err.to_string().contains("malformed"));
    }
}
