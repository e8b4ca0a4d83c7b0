//! Confirmation watcher: one task per accepted envelope.
//!
//! Polls the execution report store until a report satisfies the request's
//! validation spec or the deadline passes, then collects the broker reply
//! and emits exactly one outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::time::{Instant, sleep_until, timeout_at};

use super::replies::{ReplyInbox, ReplyWait};
use crate::application::ports::ExecutionReportStore;
use crate::domain::{
    ExecType, ExecutionReport, NotConfirmedReason, OrdStatus, OrderCommand, SubmissionEnvelope,
    Validation, ValidationOutcome, ValidationSpec, VenueOrderId,
};
use crate::observability;

/// Timing shared by every watcher.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WatchTiming {
    /// Store polling interval.
    pub poll_interval: Duration,
    /// Interval between progress lines.
    pub progress_every: Duration,
    /// Pause after a shared-queue miss.
    pub requeue_backoff: Duration,
}

/// Everything one watcher needs.
pub(crate) struct Watcher {
    pub envelope: SubmissionEnvelope,
    pub spec: ValidationSpec,
    pub started: Instant,
    pub deadline: Instant,
    pub inbox: ReplyInbox,
    pub reports: Arc<dyn ExecutionReportStore>,
    pub outbound: mpsc::UnboundedSender<ValidationOutcome>,
    pub timing: WatchTiming,
    pub limiter: Option<Arc<Semaphore>>,
}

impl Watcher {
    /// Run to completion and emit the outcome.
    pub async fn run(self) {
        observability::watcher_started();
        let kind = self.envelope.command.kind();
        let started = self.started;
        let outbound = self.outbound.clone();

        let outcome = self.confirm().await;

        tracing::info!(
            client_order_id = %outcome.envelope.client_order_id,
            kind = %kind,
            result = outcome.validated.label(),
            "Order validation finished"
        );
        observability::record_outcome(
            kind.as_str(),
            outcome.validated.label(),
            started.elapsed().as_secs_f64(),
        );
        observability::watcher_finished();

        if outbound.send(outcome).is_err() {
            tracing::warn!(kind = %kind, "Outcome stream closed, dropping outcome");
        }
    }

    async fn confirm(mut self) -> ValidationOutcome {
        let _permit = match &self.limiter {
            Some(limiter) => timeout_at(self.deadline, Arc::clone(limiter).acquire_owned())
                .await
                .ok()
                .and_then(Result::ok),
            None => None,
        };

        let confirmation = self.poll_store().await;
        let reply_id = self.envelope.client_order_id.clone();
        let is_cancel = matches!(self.envelope.command, OrderCommand::Cancel(_));

        let replies = if is_cancel {
            self.inbox.try_take(&reply_id)
        } else {
            self.inbox
                .wait_for(&reply_id, self.deadline, self.timing.requeue_backoff)
                .await
        };

        let validated = if is_cancel {
            Validation::Confirmed(Box::new(cancel_confirmation(
                &self.envelope,
                confirmation,
                &replies,
            )))
        } else {
            decide(confirmation, &replies)
        };

        ValidationOutcome {
            broker_reply: replies.last_seen,
            envelope: self.envelope,
            validated,
        }
    }

    /// Latest confirming report observed while time remained.
    async fn poll_store(&self) -> Option<ExecutionReport> {
        let watched = self.envelope.watched_id();
        let mut next_progress = Instant::now() + self.timing.progress_every;

        loop {
            let now = Instant::now();
            if now >= self.deadline {
                tracing::debug!(
                    client_order_id = %self.envelope.client_order_id,
                    "Deadline passed before a confirming report"
                );
                return None;
            }

            let snapshot = self.reports.execution_reports();
            if let Some(report) = self.spec.find_confirmation(watched, &snapshot) {
                return Some(report);
            }

            if now >= next_progress {
                tracing::info!(
                    client_order_id = %self.envelope.client_order_id,
                    watched_id = watched,
                    remaining_secs = self.deadline.saturating_duration_since(now).as_secs(),
                    "Still waiting for order confirmation"
                );
                next_progress = now + self.timing.progress_every;
            }

            sleep_until((now + self.timing.poll_interval).min(self.deadline)).await;
        }
    }
}

/// Outcome for a non-cancel request.
fn decide(confirmation: Option<ExecutionReport>, replies: &ReplyWait) -> Validation {
    let Some(report) = confirmation else {
        return Validation::NotConfirmed(NotConfirmedReason::Timeout);
    };
    match &replies.matched {
        None => Validation::NotConfirmed(NotConfirmedReason::ReplyMissing),
        Some(reply) if reply.is_error => Validation::NotConfirmed(NotConfirmedReason::ErrorReply),
        Some(_) => Validation::Confirmed(Box::new(report)),
    }
}

/// Cancels confirm themselves: the store's report, else the broker reply,
/// else a synthesized acknowledgement.
fn cancel_confirmation(
    envelope: &SubmissionEnvelope,
    confirmation: Option<ExecutionReport>,
    replies: &ReplyWait,
) -> ExecutionReport {
    confirmation
        .or_else(|| replies.matched.clone())
        .unwrap_or_else(|| {
            ExecutionReport::new(
                envelope.client_order_id.clone(),
                VenueOrderId::new(envelope.watched_id()),
                ExecType::Canceled,
                OrdStatus::Canceled,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CancelSpec, ClientOrderId, Symbol};

    fn report(exec_type: ExecType, status: OrdStatus) -> ExecutionReport {
        ExecutionReport::new(
            ClientOrderId::new("cl-1"),
            VenueOrderId::new("v-1"),
            exec_type,
            status,
        )
    }

    fn replied(report: ExecutionReport) -> ReplyWait {
        ReplyWait {
            matched: Some(report.clone()),
            last_seen: Some(report),
        }
    }

    #[test]
    fn confirmed_needs_store_report_and_clean_reply() {
        let fill = report(ExecType::Trade, OrdStatus::Filled);
        let ack = report(ExecType::New, OrdStatus::New);

        assert_eq!(
            decide(Some(fill.clone()), &replied(ack.clone())),
            Validation::Confirmed(Box::new(fill.clone()))
        );
        assert_eq!(
            decide(None, &replied(ack.clone())),
            Validation::NotConfirmed(NotConfirmedReason::Timeout)
        );
        assert_eq!(
            decide(Some(fill.clone()), &ReplyWait::default()),
            Validation::NotConfirmed(NotConfirmedReason::ReplyMissing)
        );
        assert_eq!(
            decide(Some(fill), &replied(ack.with_error("overloaded"))),
            Validation::NotConfirmed(NotConfirmedReason::ErrorReply)
        );
    }

    #[test]
    fn cancel_falls_back_to_synthesized_ack() {
        let envelope = SubmissionEnvelope::new(
            ClientOrderId::new("cl-cancel"),
            Symbol::new("XBTUSD"),
            OrderCommand::Cancel(CancelSpec {
                client_order_id: ClientOrderId::new("cl-target"),
            }),
            Duration::from_secs(1),
        );

        let ack = cancel_confirmation(&envelope, None, &ReplyWait::default());
        assert_eq!(ack.exec_type, ExecType::Canceled);
        assert_eq!(ack.order_status, OrdStatus::Canceled);
        assert!(ack.refers_to("cl-target"));

        let reply = report(ExecType::Canceled, OrdStatus::Canceled);
        assert_eq!(
            cancel_confirmation(&envelope, None, &replied(reply.clone())),
            reply
        );
    }
}
