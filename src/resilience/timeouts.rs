//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every store fetch with a deadline
//! - Cancel the fetch cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other store errors
//! - No automatic retry; the client may retry the idempotent request

use std::future::Future;
use std::time::Duration;

use crate::storage::StoreError;

/// Run a store operation, failing with `StoreError::Timeout` after `limit`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
