//! Prometheus metrics for the order coordinator.
//!
//! Recording functions are no-ops until a recorder is installed, so the
//! coordinator can run without an exporter.
//!
//! # Example
//!
//! ```ignore
//! use order_coordinator::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::with_port(9090))?;
//! record_outcome("limit", "confirmed", 0.42);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsConfig {
    /// Listen on all interfaces at `port`.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            // Broker calls are sub-second, confirmations run to minutes
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0,
            ],
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Dispatch Metrics
// ============================================================================

/// Record a broker call that returned an acknowledgement.
///
/// # Arguments
///
/// * `kind` - Order kind label (e.g., "limit", "amend")
/// * `latency_seconds` - Broker call duration in seconds
pub fn record_dispatch(kind: &str, latency_seconds: f64) {
    counter!("coordinator_dispatched_total", "kind" => kind.to_string()).increment(1);
    histogram!("coordinator_broker_latency_seconds", "kind" => kind.to_string())
        .record(latency_seconds);
}

/// Record a failed broker call or price lookup.
pub fn record_dispatch_failure(kind: &str, failure: &str) {
    counter!(
        "coordinator_dispatch_failures_total",
        "kind" => kind.to_string(),
        "failure" => failure.to_string()
    )
    .increment(1);
}

/// Record a reduced-quantity resubmission.
pub fn record_resubmission(kind: &str) {
    counter!("coordinator_resubmissions_total", "kind" => kind.to_string()).increment(1);
}

// ============================================================================
// Confirmation Metrics
// ============================================================================

/// Record an outcome emitted by a watcher.
///
/// # Arguments
///
/// * `kind` - Order kind label
/// * `result` - Outcome label (e.g., "confirmed", "timeout")
/// * `elapsed_seconds` - Time from dispatch to outcome in seconds
pub fn record_outcome(kind: &str, result: &str, elapsed_seconds: f64) {
    record_early_outcome(kind, result);
    histogram!("coordinator_confirmation_seconds", "kind" => kind.to_string())
        .record(elapsed_seconds);
}

/// Record an outcome emitted before any watcher ran (rejections, aborts).
///
/// Only the outcome counter moves; the confirmation histogram is left alone.
pub fn record_early_outcome(kind: &str, result: &str) {
    counter!(
        "coordinator_outcomes_total",
        "kind" => kind.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// A watcher started.
pub fn watcher_started() {
    gauge!("coordinator_watchers_in_flight").increment(1.0);
}

/// A watcher finished.
pub fn watcher_finished() {
    gauge!("coordinator_watchers_in_flight").decrement(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_listens_on_9090() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_dispatch("limit", 0.01);
        record_dispatch_failure("limit", "invalid_order_qty");
        record_resubmission("limit");
        record_outcome("limit", "confirmed", 0.5);
        record_early_outcome("limit", "rejected");
        watcher_started();
        watcher_finished();
    }

    #[test]
    fn early_outcomes_skip_the_confirmation_histogram() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_early_outcome("market", "quantity_exhausted");
        });
        let rendered = handle.render();
        assert!(rendered.contains("coordinator_outcomes_total"));
        assert!(!rendered.contains("coordinator_confirmation_seconds"));

        metrics::with_local_recorder(&recorder, || {
            record_outcome("market", "confirmed", 0.25);
        });
        assert!(handle.render().contains("coordinator_confirmation_seconds"));
    }
}
