//! Request inspection.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for tracing
//! - Classify the method into the three things the router does
//! - Extract routing-relevant information (host, path, validator)

use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Issues a fresh UUID v4 for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID set by the request-id layer, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// What the router does with a request, decided by its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// GET or HEAD: resolve and serve a blob.
    Fetch { head: bool },
    /// OPTIONS: CORS preflight.
    Preflight,
    /// Anything else.
    Unsupported,
}

impl RequestKind {
    pub fn classify(method: &Method) -> Self {
        match *method {
            Method::GET => RequestKind::Fetch { head: false },
            Method::HEAD => RequestKind::Fetch { head: true },
            Method::OPTIONS => RequestKind::Preflight,
            _ => RequestKind::Unsupported,
        }
    }
}

/// Requested hostname: `Host` header, else the URI authority (HTTP/2).
pub fn request_host(parts: &Parts) -> &str {
    parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .unwrap_or_default()
}

/// Validator from `If-None-Match`, if present and readable.
pub fn if_none_match(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}
