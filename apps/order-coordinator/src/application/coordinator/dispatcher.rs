//! Dispatcher: the single task that turns envelopes into broker calls.
//!
//! Broker calls happen one at a time in arrival order. Each acknowledged
//! call gets a watcher; failures go through the failure policy instead.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::failure::{self, FailureAction};
use super::replies::{BrokerReply, ReplyChannel, ReplyInbox};
use super::watcher::{WatchTiming, Watcher};
use crate::application::ports::{
    AmendOrderRequest, BrokerPort, CancelOrderRequest, ExecutionReportStore, PlaceOrderRequest,
    ReferencePricePort,
};
use crate::config::{CoordinatorConfig, FatalPolicy};
use crate::domain::order::default_stop_price;
use crate::domain::{
    ExecutionReport, NotConfirmedReason, OrderCommand, OrderKind, OrderSpec, SubmissionEnvelope,
    ValidationOutcome, ValidationSpec,
};
use crate::error::{CoordinatorError, DispatchError};
use crate::observability;

pub(crate) struct Dispatcher {
    pub broker: Arc<dyn BrokerPort>,
    pub prices: Arc<dyn ReferencePricePort>,
    pub reports: Arc<dyn ExecutionReportStore>,
    pub config: CoordinatorConfig,
    pub replies: ReplyChannel,
    pub outbound: mpsc::UnboundedSender<ValidationOutcome>,
    pub tracker: TaskTracker,
    pub limiter: Option<Arc<Semaphore>>,
    pub cancel: CancellationToken,
    /// Most recent reply handed to the reply channel.
    pub last_reply: Option<BrokerReply>,
}

impl Dispatcher {
    /// Drain the inbound queue until cancelled or closed.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<SubmissionEnvelope>,
    ) -> Result<(), CoordinatorError> {
        tracing::info!(
            routing = ?self.config.reply_routing,
            fatal_policy = ?self.config.fatal_policy,
            "Dispatcher started"
        );

        let result = loop {
            let envelope = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break Ok(()),
                next = inbound.recv() => match next {
                    Some(envelope) => envelope,
                    None => break Ok(()),
                },
            };

            if let Err(err) = self.dispatch(envelope).await {
                tracing::error!(error = %err, "Dispatcher stopping on fatal failure");
                break Err(err);
            }
        };

        self.abort_queued(&mut inbound);
        tracing::info!("Dispatcher stopped");
        result
    }

    /// Envelopes still queued when the dispatcher stops get an aborted
    /// outcome.
    fn abort_queued(&self, inbound: &mut mpsc::UnboundedReceiver<SubmissionEnvelope>) {
        inbound.close();
        while let Ok(envelope) = inbound.try_recv() {
            tracing::warn!(
                client_order_id = %envelope.client_order_id,
                "Dispatcher stopped before this order was sent"
            );
            self.emit(ValidationOutcome::rejected_early(
                envelope,
                NotConfirmedReason::Aborted("coordinator stopped".to_string()),
            ));
        }
    }

    /// Send one envelope, resubmitting with reduced quantity while the
    /// broker reports insufficient balance.
    async fn dispatch(&mut self, mut envelope: SubmissionEnvelope) -> Result<(), CoordinatorError> {
        loop {
            let kind = envelope.command.kind();
            let started = Instant::now();
            let timeout = self.config.effective_timeout(kind, envelope.timeout);
            let inbox = self.replies.open(&envelope.client_order_id);

            tracing::info!(
                client_order_id = %envelope.client_order_id,
                symbol = %envelope.symbol,
                kind = %kind,
                quantity = ?envelope.command.quantity(),
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Dispatching order"
            );

            let error = match self.call_broker(&envelope).await {
                Ok(report) => {
                    observability::record_dispatch(
                        kind.as_str(),
                        started.elapsed().as_secs_f64(),
                    );
                    let reply = BrokerReply {
                        client_order_id: envelope.client_order_id.clone(),
                        report,
                    };
                    self.last_reply = Some(reply.clone());
                    self.replies.publish(reply);
                    self.spawn_watcher(envelope, inbox, started, started + timeout);
                    return Ok(());
                }
                Err(error) => error,
            };

            // Release the reply slot before a resubmission registers it again.
            drop(inbox);
            observability::record_dispatch_failure(kind.as_str(), error.label());

            match failure::classify(
                kind,
                envelope.command.quantity(),
                &error,
                &self.config.quantity_reduction(),
            ) {
                FailureAction::Resubmit(quantity) => {
                    tracing::warn!(
                        client_order_id = %envelope.client_order_id,
                        quantity = ?envelope.command.quantity(),
                        reduced = quantity,
                        "Insufficient balance, resubmitting with reduced quantity"
                    );
                    observability::record_resubmission(kind.as_str());
                    envelope = envelope.resubmitted_with(quantity);
                }
                FailureAction::Reject(reason) => {
                    tracing::warn!(
                        client_order_id = %envelope.client_order_id,
                        kind = %kind,
                        error = %error,
                        "Order rejected"
                    );
                    self.emit(ValidationOutcome::rejected_early(envelope, reason));
                    return Ok(());
                }
                FailureAction::Fatal => return self.handle_fatal(envelope, error),
            }
        }
    }

    fn handle_fatal(
        &self,
        envelope: SubmissionEnvelope,
        error: DispatchError,
    ) -> Result<(), CoordinatorError> {
        tracing::error!(
            client_order_id = %envelope.client_order_id,
            kind = %envelope.command.kind(),
            error = %error,
            policy = ?self.config.fatal_policy,
            pending_reply = ?self.last_reply.as_ref().map(|reply| &reply.report),
            "Fatal dispatch failure"
        );
        match self.config.fatal_policy {
            FatalPolicy::Isolate => {
                self.emit(ValidationOutcome::rejected_early(
                    envelope,
                    NotConfirmedReason::Aborted(error.to_string()),
                ));
                Ok(())
            }
            FatalPolicy::Propagate => Err(CoordinatorError::Fatal {
                client_order_id: envelope.client_order_id.into_inner(),
                source: error,
            }),
        }
    }

    fn spawn_watcher(
        &self,
        envelope: SubmissionEnvelope,
        inbox: ReplyInbox,
        started: Instant,
        deadline: Instant,
    ) {
        let spec = ValidationSpec::for_request(envelope.command.kind(), envelope.sender.kind);
        let spec = if self.config.accept_cancel_as_confirmation {
            spec
        } else {
            spec.without_implicit_cancel()
        };

        let watcher = Watcher {
            envelope,
            spec,
            started,
            deadline,
            inbox,
            reports: Arc::clone(&self.reports),
            outbound: self.outbound.clone(),
            timing: WatchTiming {
                poll_interval: self.config.poll_interval(),
                progress_every: self.config.progress_log_interval(),
                requeue_backoff: self.config.requeue_backoff(),
            },
            limiter: self.limiter.clone(),
        };
        self.tracker.spawn(watcher.run());
    }

    fn emit(&self, outcome: ValidationOutcome) {
        observability::record_early_outcome(
            outcome.envelope.command.kind().as_str(),
            outcome.validated.label(),
        );
        if self.outbound.send(outcome).is_err() {
            tracing::warn!("Outcome stream closed, dropping outcome");
        }
    }

    // =========================================================================
    // Broker calls
    // =========================================================================

    async fn call_broker(
        &self,
        envelope: &SubmissionEnvelope,
    ) -> Result<ExecutionReport, DispatchError> {
        let broker = self.broker.as_ref();
        let report = match &envelope.command {
            OrderCommand::Market(spec) => {
                broker.place_market(self.place_request(envelope, spec).await?).await?
            }
            OrderCommand::Limit(spec) => {
                broker.place_limit(self.place_request(envelope, spec).await?).await?
            }
            OrderCommand::Stop(spec) => {
                broker.place_stop(self.place_request(envelope, spec).await?).await?
            }
            OrderCommand::StopLimit(spec) => {
                broker
                    .place_stop_limit(self.place_request(envelope, spec).await?)
                    .await?
            }
            OrderCommand::MarketIfTouched(spec) => {
                broker
                    .place_market_if_touched(self.place_request(envelope, spec).await?)
                    .await?
            }
            OrderCommand::LimitIfTouched(spec) => {
                broker
                    .place_limit_if_touched(self.place_request(envelope, spec).await?)
                    .await?
            }
            OrderCommand::Amend(spec) => {
                let request = AmendOrderRequest {
                    client_order_id: envelope.client_order_id.clone(),
                    order_id: spec.order_id.clone(),
                    symbol: envelope.symbol.clone(),
                    side: spec.side,
                    amended_kind: spec.amended_kind,
                    new_price: spec.new_price,
                    max_price_delta: self.prices.default_stop_offset(&envelope.symbol).await?,
                    text: spec.text.clone(),
                };
                broker.amend(request).await?
            }
            OrderCommand::Cancel(spec) => {
                broker
                    .cancel(CancelOrderRequest {
                        client_order_id: spec.client_order_id.clone(),
                        symbol: envelope.symbol.clone(),
                    })
                    .await?
            }
        };
        Ok(report)
    }

    /// Placement request with missing prices filled in.
    async fn place_request(
        &self,
        envelope: &SubmissionEnvelope,
        spec: &OrderSpec,
    ) -> Result<PlaceOrderRequest, DispatchError> {
        let kind = envelope.command.kind();
        let (price, stop_price) = self.resolve_prices(envelope, kind, spec).await?;
        let instructions = match kind {
            OrderKind::Market | OrderKind::Limit => spec.instructions.without_trigger_prices(),
            _ => spec.instructions.clone(),
        };

        Ok(PlaceOrderRequest::new(
            envelope.client_order_id.clone(),
            envelope.symbol.clone(),
            spec.side,
            spec.quantity,
        )
        .with_price(price)
        .with_stop_price(stop_price)
        .with_instructions(instructions))
    }

    /// Limit and trigger prices to send for `kind`.
    ///
    /// A missing price is looked up when the kind rests with a limit or
    /// when a trigger has to be derived from it.
    async fn resolve_prices(
        &self,
        envelope: &SubmissionEnvelope,
        kind: OrderKind,
        spec: &OrderSpec,
    ) -> Result<(Option<Decimal>, Option<Decimal>), DispatchError> {
        let derive_stop = kind.requires_stop_price() && spec.stop_price.is_none();
        let base = match spec.price {
            Some(price) => Some(price),
            None if kind.requires_price() || derive_stop => {
                let price = self
                    .prices
                    .reference_price(&envelope.symbol, spec.side, &spec.instructions)
                    .await?;
                tracing::debug!(
                    client_order_id = %envelope.client_order_id,
                    price = %price,
                    "Using reference price"
                );
                Some(price)
            }
            None => None,
        };

        let stop_price = match (spec.stop_price, base) {
            (Some(stop), _) => Some(stop),
            (None, Some(base)) if derive_stop => {
                let offset = match spec.stop_offset {
                    Some(offset) => offset,
                    None => self.prices.default_stop_offset(&envelope.symbol).await?,
                };
                default_stop_price(kind, spec.side, base, offset)
            }
            (None, _) => None,
        };

        let price = if kind.requires_price() { base } else { None };
        let stop_price = if kind.requires_stop_price() {
            stop_price
        } else {
            None
        };
        Ok((price, stop_price))
    }
}
