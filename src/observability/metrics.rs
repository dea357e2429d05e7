//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_state` (gauge): 0=starting, 1=ready, 2=shutting down, 3=shut down
//! - `lifecycle_inflight_requests` (gauge): requests currently being served
//! - `lifecycle_shutdown_initiated_total` (counter): by trigger
//! - `lifecycle_shutdown_completed_total` (counter): by result
//! - `lifecycle_shutdown_duration_seconds` (histogram): trigger to terminal state
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is installed only by the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::LifecycleState;

pub(crate) const METRIC_STATE: &str = "lifecycle_state";
pub(crate) const METRIC_INFLIGHT: &str = "lifecycle_inflight_requests";
pub(crate) const METRIC_SHUTDOWN_INITIATED: &str = "lifecycle_shutdown_initiated_total";
pub(crate) const METRIC_SHUTDOWN_COMPLETED: &str = "lifecycle_shutdown_completed_total";
pub(crate) const METRIC_SHUTDOWN_DURATION: &str = "lifecycle_shutdown_duration_seconds";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub(crate) fn record_state(state: LifecycleState) {
    let value = match state {
        LifecycleState::Starting => 0.0,
        LifecycleState::Ready => 1.0,
        LifecycleState::ShuttingDown => 2.0,
        LifecycleState::ShutDown => 3.0,
    };
    metrics::gauge!(METRIC_STATE).set(value);
}

pub(crate) fn record_inflight(count: u64) {
    metrics::gauge!(METRIC_INFLIGHT).set(count as f64);
}

pub(crate) fn record_shutdown_initiated(trigger: &'static str) {
    metrics::counter!(METRIC_SHUTDOWN_INITIATED, "trigger" => trigger).increment(1);
}

pub(crate) fn record_shutdown_completed(result: &'static str, duration: Duration) {
    metrics::counter!(METRIC_SHUTDOWN_COMPLETED, "result" => result).increment(1);
    metrics::histogram!(METRIC_SHUTDOWN_DURATION, "result" => result)
        .record(duration.as_secs_f64());
}
