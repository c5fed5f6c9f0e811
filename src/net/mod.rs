//! Network layer subsystem.
//!
//! Plain TCP is served straight from `axum::serve` in `http::server`; this
//! module only adds optional TLS termination.
//!
//! # Design Decisions
//! - TLS is optional and handled transparently (rustls via axum-server)
//! - Edge deployments usually terminate TLS upstream, so plain TCP is the default

pub mod tls;
