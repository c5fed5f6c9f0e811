//! Edge router serving versioned static-site builds from content-addressed storage.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod manifest;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod storage;

pub use config::RouterConfig;
pub use error::RouterError;
pub use http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use manifest::{Manifest, ManifestEntry};
