//! Metrics collection and exposition.
//!
//! # Metrics
//! - `recorder_requests_total` (counter): proxied requests by method, status
//! - `recorder_request_duration_seconds` (histogram): handler time per request,
//!   including inline recording
//! - `recorder_recordings_total` (counter): recording outcomes by `outcome`
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; a no-op until an exporter is installed
//! - Prometheus exporter is optional and off by default

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "recorder_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("recorder_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one recording attempt.
pub fn record_recording(outcome: &'static str) {
    metrics::counter!("recorder_recordings_total", "outcome" => outcome).increment(1);
}
