//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (host, path)
//!     → tenant.rs (host → build id)
//!     → [manifest cache supplies the build's manifest]
//!     → rules.rs (path → manifest entry, ordered fallbacks)
//!     → Return: entry + matched rule, or NotFound
//! ```
//!
//! # Design Decisions
//! - Both steps are pure and synchronous; all I/O lives in storage/manifest
//! - Deterministic: same (host, path, manifest) always yields the same entry
//! - First match wins (fixed rule order)

pub mod rules;
pub mod tenant;

pub use rules::{resolve, resolve_with_rule, PathRule, Resolution};
pub use tenant::{TenantResolver, MAIN_BUILD, PREVIEW_PREFIX};
