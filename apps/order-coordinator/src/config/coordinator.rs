//! Coordinator configuration: polling, reply routing, failure policy and
//! timeout overrides.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::{OrderKind, QuantityReduction};

/// How broker replies reach their watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyRouting {
    /// Per-order reply slots fed by a routing task.
    #[default]
    Registry,
    /// One shared queue; watchers requeue replies that are not theirs.
    SharedQueue,
}

/// What the dispatcher does with a fatal broker failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalPolicy {
    /// Report the failing request as aborted and keep dispatching.
    #[default]
    Isolate,
    /// Stop the dispatcher and surface the error from `join`.
    Propagate,
}

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Store polling interval (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Interval between progress lines of a waiting watcher (seconds).
    #[serde(default = "default_progress_log_secs")]
    pub progress_log_secs: u64,
    /// Reply routing mode.
    #[serde(default)]
    pub reply_routing: ReplyRouting,
    /// Pause before a shared-queue watcher reads again after a miss
    /// (milliseconds).
    #[serde(default = "default_requeue_backoff_ms")]
    pub requeue_backoff_ms: u64,
    /// Fatal failure policy.
    #[serde(default)]
    pub fatal_policy: FatalPolicy,
    /// Treat `(Canceled, Canceled)` as confirming any order.
    #[serde(default)]
    pub accept_cancel_as_confirmation: bool,
    /// Timeout forced on market orders (seconds); `None` keeps the
    /// envelope's.
    #[serde(default = "default_market_timeout_secs")]
    pub market_timeout_secs: Option<u64>,
    /// Timeout forced on cancels (seconds); `None` keeps the envelope's.
    #[serde(default = "default_cancel_timeout_secs")]
    pub cancel_timeout_secs: Option<u64>,
    /// Upper bound on concurrently polling watchers; unbounded when unset.
    #[serde(default)]
    pub max_concurrent_watchers: Option<usize>,
    /// Quantity multiplier after an insufficient balance failure.
    #[serde(default = "default_reduction_factor")]
    pub reduction_factor: Decimal,
    /// Smallest quantity worth resubmitting.
    #[serde(default = "default_min_quantity")]
    pub min_quantity: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            progress_log_secs: default_progress_log_secs(),
            reply_routing: ReplyRouting::default(),
            requeue_backoff_ms: default_requeue_backoff_ms(),
            fatal_policy: FatalPolicy::default(),
            accept_cancel_as_confirmation: false,
            market_timeout_secs: default_market_timeout_secs(),
            cancel_timeout_secs: default_cancel_timeout_secs(),
            max_concurrent_watchers: None,
            reduction_factor: default_reduction_factor(),
            min_quantity: default_min_quantity(),
        }
    }
}

impl CoordinatorConfig {
    /// Store polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Interval between progress lines.
    #[must_use]
    pub const fn progress_log_interval(&self) -> Duration {
        Duration::from_secs(self.progress_log_secs)
    }

    /// Pause after a shared-queue miss.
    #[must_use]
    pub const fn requeue_backoff(&self) -> Duration {
        Duration::from_millis(self.requeue_backoff_ms)
    }

    /// Insufficient balance policy.
    #[must_use]
    pub const fn quantity_reduction(&self) -> QuantityReduction {
        QuantityReduction::new(self.reduction_factor, self.min_quantity)
    }

    /// Confirmation timeout for a request of `kind` that asked for
    /// `requested`.
    #[must_use]
    pub fn effective_timeout(&self, kind: OrderKind, requested: Duration) -> Duration {
        let forced = match kind {
            OrderKind::Market => self.market_timeout_secs,
            OrderKind::Cancel => self.cancel_timeout_secs,
            _ => None,
        };
        forced.map_or(requested, Duration::from_secs)
    }

    /// Overrides for tests and embedders that want envelope timeouts
    /// honoured as given.
    #[must_use]
    pub const fn without_timeout_overrides(mut self) -> Self {
        self.market_timeout_secs = None;
        self.cancel_timeout_secs = None;
        self
    }
}

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_progress_log_secs() -> u64 {
    298
}

const fn default_requeue_backoff_ms() -> u64 {
    10
}

#[allow(clippy::unnecessary_wraps)]
const fn default_market_timeout_secs() -> Option<u64> {
    Some(300)
}

#[allow(clippy::unnecessary_wraps)]
const fn default_cancel_timeout_secs() -> Option<u64> {
    Some(60)
}

fn default_reduction_factor() -> Decimal {
    dec!(0.8)
}

const fn default_min_quantity() -> u64 {
    31
}
