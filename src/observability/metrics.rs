//! Metrics collection and exposition.
//!
//! # Metrics
//! - `science_requests_total` (counter): dispatched requests by outcome
//! - `science_diffs_total` (counter): mismatches by experiment/control code
//! - `science_forward_errors_total` (counter): failed forwards by side and kind
//! - `science_forward_duration_seconds` (histogram): per-backend latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::dispatch::{DispatchOutcome, Side};
use crate::forward::ForwardError;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_outcome(outcome: DispatchOutcome) {
    metrics::counter!("science_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_diff(experiment_code: i32, control_code: i32) {
    metrics::counter!(
        "science_diffs_total",
        "experiment_code" => experiment_code.to_string(),
        "control_code" => control_code.to_string()
    )
    .increment(1);
}

pub fn record_forward_error(side: Side, error: &ForwardError) {
    metrics::counter!(
        "science_forward_errors_total",
        "side" => side.as_str(),
        "kind" => error.kind()
    )
    .increment(1);
}

pub fn record_forward_duration(side: Side, start: Instant) {
    metrics::histogram!("science_forward_duration_seconds", "side" => side.as_str())
        .record(start.elapsed().as_secs_f64());
}
