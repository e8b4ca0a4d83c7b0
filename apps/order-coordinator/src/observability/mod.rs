//! Observability: Prometheus metrics.

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_dispatch, record_dispatch_failure,
    record_early_outcome, record_outcome, record_resubmission, watcher_finished, watcher_started,
};
