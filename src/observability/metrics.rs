//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_backend_score` (gauge): last stored load score, by address
//! - `lb_backend_report_errors_total` (counter): failed reports, by address and decision
//! - `lb_backend_dial_failures_total` (counter): units created in degraded mode
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::backend::Decision;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_score(address: &str, score: i64) {
    gauge!("lb_backend_score", "address" => address.to_string()).set(score as f64);
}

pub fn record_report_error(address: &str, decision: Decision) {
    counter!(
        "lb_backend_report_errors_total",
        "address" => address.to_string(),
        "decision" => decision.as_str()
    )
    .increment(1);
}

pub fn record_dial_failure(address: &str) {
    counter!("lb_backend_dial_failures_total", "address" => address.to_string()).increment(1);
}
