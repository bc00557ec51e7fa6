//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, deferred work)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by dispatch outcome, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_deferred_tasks_total` (counter): work scheduled with `wait_until`
//! - `gateway_store_operations_total` (counter): store calls by operation
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record one deferred task registration.
pub fn record_deferred_task() {
    counter!("gateway_deferred_tasks_total").increment(1);
}

/// Record one key-value store call.
pub fn record_store_operation(operation: &'static str) {
    counter!("gateway_store_operations_total", "operation" => operation).increment(1);
}
