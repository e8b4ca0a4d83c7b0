//! Order Coordinator
//!
//! Accepts submission envelopes from any number of producers, sends exactly
//! one broker call per envelope (serialized by the dispatcher), confirms
//! each call against the execution report store in its own watcher task,
//! and streams one [`ValidationOutcome`] per envelope back.
//!
//! ```text
//! producers ──submit_order──▶ inbound ──▶ Dispatcher ──▶ BrokerPort
//!                                             │              │
//!                                       spawn Watcher     replies
//!                                             │              │
//!                      ExecutionReportStore ◀─┴── poll ──────┘
//!                                             │
//! producers ◀──────── OutcomeStream ◀─────────┘
//! ```

mod dispatcher;
mod failure;
mod replies;
mod watcher;

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::application::ports::{BrokerPort, ExecutionReportStore, ReferencePricePort};
use crate::config::{CoordinatorConfig, ReplyRouting};
use crate::domain::{SubmissionEnvelope, ValidationOutcome};
use crate::error::CoordinatorError;

use dispatcher::Dispatcher;
use replies::{ReplyChannel, ReplyRegistry, SharedReplyQueue, route_replies};

/// Stream of outcomes, one per envelope. Ends after the coordinator has
/// stopped and every watcher has finished.
pub type OutcomeStream = UnboundedReceiverStream<ValidationOutcome>;

/// The coordinator before it is started.
pub struct OrderCoordinator {
    broker: Arc<dyn BrokerPort>,
    prices: Arc<dyn ReferencePricePort>,
    reports: Arc<dyn ExecutionReportStore>,
    config: CoordinatorConfig,
}

impl OrderCoordinator {
    /// Create a coordinator over its collaborators.
    pub fn new(
        broker: Arc<dyn BrokerPort>,
        prices: Arc<dyn ReferencePricePort>,
        reports: Arc<dyn ExecutionReportStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            broker,
            prices,
            reports,
            config,
        }
    }

    /// Spawn the dispatcher (and the reply router when routing by
    /// registry). Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(self) -> (CoordinatorHandle, OutcomeStream) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let replies = match self.config.reply_routing {
            ReplyRouting::Registry => {
                let registry = Arc::new(ReplyRegistry::default());
                let (raw_tx, raw_rx) = mpsc::unbounded_channel();
                tracker.spawn(route_replies(Arc::clone(&registry), raw_rx));
                ReplyChannel::Registry {
                    registry,
                    raw: raw_tx,
                }
            }
            ReplyRouting::SharedQueue => ReplyChannel::Shared(SharedReplyQueue::new()),
        };
        let limiter = self
            .config
            .max_concurrent_watchers
            .map(|permits| Arc::new(Semaphore::new(permits)));

        let dispatcher = Dispatcher {
            broker: self.broker,
            prices: self.prices,
            reports: self.reports,
            config: self.config,
            replies,
            outbound: outbound_tx,
            tracker: tracker.clone(),
            limiter,
            cancel: cancel.clone(),
            last_reply: None,
        };
        let task = tokio::spawn(dispatcher.run(inbound_rx));

        let handle = CoordinatorHandle {
            inbound: inbound_tx,
            cancel,
            tracker,
            task,
        };
        (handle, UnboundedReceiverStream::new(outbound_rx))
    }
}

/// Producer-side handle of a running coordinator.
pub struct CoordinatorHandle {
    inbound: mpsc::UnboundedSender<SubmissionEnvelope>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    task: JoinHandle<Result<(), CoordinatorError>>,
}

impl CoordinatorHandle {
    /// Enqueue an envelope. Never waits.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Stopped`] once the dispatcher has
    /// stopped.
    pub fn submit_order(&self, envelope: SubmissionEnvelope) -> Result<(), CoordinatorError> {
        self.inbound
            .send(envelope)
            .map_err(|_| CoordinatorError::Stopped)
    }

    /// A clonable submitter for other producers.
    #[must_use]
    pub fn submitter(&self) -> OrderSubmitter {
        OrderSubmitter {
            inbound: self.inbound.clone(),
        }
    }

    /// Stop dispatching. Queued envelopes get an aborted outcome; running
    /// watchers finish on their own deadline.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the dispatcher is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Close the inbound queue, let the dispatcher drain it, then wait for
    /// every watcher. The queue only closes once every [`OrderSubmitter`]
    /// is dropped too.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the dispatcher under the
    /// propagate policy, or [`CoordinatorError::TaskFailed`] if it panicked.
    pub async fn join(self) -> Result<(), CoordinatorError> {
        let Self {
            inbound,
            tracker,
            task,
            ..
        } = self;
        drop(inbound);

        let result = match task.await {
            Ok(result) => result,
            Err(err) => Err(CoordinatorError::TaskFailed {
                message: err.to_string(),
            }),
        };

        tracker.close();
        tracker.wait().await;
        result
    }
}

/// Clonable producer endpoint.
#[derive(Debug, Clone)]
pub struct OrderSubmitter {
    inbound: mpsc::UnboundedSender<SubmissionEnvelope>,
}

impl OrderSubmitter {
    /// Enqueue an envelope. Never waits.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Stopped`] once the dispatcher has
    /// stopped.
    pub fn submit_order(&self, envelope: SubmissionEnvelope) -> Result<(), CoordinatorError> {
        self.inbound
            .send(envelope)
            .map_err(|_| CoordinatorError::Stopped)
    }
}
