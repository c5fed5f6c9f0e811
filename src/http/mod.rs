//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, method classification, host)
//!     → dispatch.rs (tenant → manifest → path → blob)
//!     → response.rs (blob → headers, 304, HEAD)
//!     → cors.rs (preflight, allow-origin)
//!     → Send to client
//! ```

pub mod cors;
pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::Dispatcher;
pub use request::{MakeRequestUuidV4, RequestKind, X_REQUEST_ID};
pub use response::ResponseBuilder;
pub use server::HttpServer;
