//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, backend errors, rewrites)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-tool and aggregate metrics
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by tool, method, status
//! - `gateway_request_duration_seconds` (histogram): latency per tool
//! - `gateway_backend_errors_total` (counter): forward failures by tool, kind
//! - `gateway_rewrites_total` (counter): HTML rewrites by tool, mode, outcome
//! - `gateway_cache_refreshes_total` (counter): TTL cache reloads by cache
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Labels for tool, method, status code

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(tool: &str, method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "tool" => tool.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "tool" => tool.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_error(tool: &str, kind: &'static str) {
    counter!("gateway_backend_errors_total", "tool" => tool.to_string(), "kind" => kind).increment(1);
}

pub fn record_rewrite(tool: &str, mode: &'static str, outcome: &'static str) {
    counter!(
        "gateway_rewrites_total",
        "tool" => tool.to_string(),
        "mode" => mode,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cache_refresh(cache: &'static str) {
    counter!("gateway_cache_refreshes_total", "cache" => cache).increment(1);
}
