//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Fetch from manifest/blob store:
//!     → timeouts.rs (enforce store deadline)
//!     → On expiry: StoreError::Timeout → 500 to the client
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every store call has a deadline
//! - No internal retries: GET/HEAD are idempotent, the client retries
//!   instead, which keeps a struggling store from seeing amplified load

pub mod timeouts;
