//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by method, status
//! - `router_request_duration_seconds` (histogram): end-to-end latency
//! - `router_manifest_cache_total` (counter): manifest lookups by outcome (hit, miss)
//! - `router_store_fetch_total` (counter): store fetches by store and outcome
//!
//! Without an installed recorder every call here is a no-op, so tests and the
//! CLI pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::storage::StoreError;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("router_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("router_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_manifest_lookup(outcome: &'static str) {
    counter!("router_manifest_cache_total", "outcome" => outcome).increment(1);
}

/// Record the outcome of a manifest or blob fetch.
pub fn record_store_fetch<T>(store: &'static str, result: &Result<Option<T>, StoreError>) {
    let outcome = match result {
        Ok(Some(_)) => "found",
        Ok(None) => "absent",
        Err(StoreError::Timeout(_)) => "timeout",
        Err(_) => "error",
    };
    counter!("router_store_fetch_total", "store" => store, "outcome" => outcome).increment(1);
}
