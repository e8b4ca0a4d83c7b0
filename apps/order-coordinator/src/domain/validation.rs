//! Confirmation rules and the outcome reported back to producers.

use serde::{Deserialize, Serialize};

use crate::domain::envelope::{SenderKind, SubmissionEnvelope};
use crate::domain::order::OrderKind;
use crate::domain::report::{ExecType, ExecutionReport, OrdStatus};

/// One (execType, orderStatus) pair that confirms an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationCondition {
    /// Expected event kind.
    pub exec_type: ExecType,
    /// Expected order state.
    pub order_status: OrdStatus,
}

impl ValidationCondition {
    /// Create a condition.
    #[must_use]
    pub const fn new(exec_type: ExecType, order_status: OrdStatus) -> Self {
        Self {
            exec_type,
            order_status,
        }
    }

    const CANCELED: Self = Self::new(ExecType::Canceled, OrdStatus::Canceled);
}

/// The set of reports that confirm a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSpec {
    conditions: Vec<ValidationCondition>,
    accept_cancel: bool,
}

impl ValidationSpec {
    /// A spec made of explicit conditions, with the implicit cancel
    /// confirmation enabled.
    #[must_use]
    pub const fn new(conditions: Vec<ValidationCondition>) -> Self {
        Self {
            conditions,
            accept_cancel: true,
        }
    }

    /// Confirmation rules for a command kind sent by a sender kind.
    ///
    /// - conditional kinds from a trailing-stop sender: `(New, New)`
    /// - amend: `(Replaced, New)`
    /// - cancel: `(Canceled, Canceled)`
    /// - everything else: `(Trade, Filled)`
    #[must_use]
    pub fn for_request(kind: OrderKind, sender: SenderKind) -> Self {
        let condition = match kind {
            OrderKind::Amend => ValidationCondition::new(ExecType::Replaced, OrdStatus::New),
            OrderKind::Cancel => ValidationCondition::CANCELED,
            k if k.is_conditional() && sender == SenderKind::TrailingStop => {
                ValidationCondition::new(ExecType::New, OrdStatus::New)
            }
            _ => ValidationCondition::new(ExecType::Trade, OrdStatus::Filled),
        };
        Self::new(vec![condition])
    }

    /// Disable the implicit `(Canceled, Canceled)` confirmation.
    #[must_use]
    pub fn without_implicit_cancel(mut self) -> Self {
        self.accept_cancel = false;
        self
    }

    /// Explicit conditions.
    #[must_use]
    pub fn conditions(&self) -> &[ValidationCondition] {
        &self.conditions
    }

    /// Whether a canceled report also confirms.
    #[must_use]
    pub const fn accepts_cancel(&self) -> bool {
        self.accept_cancel
    }

    /// True when `report` satisfies one of the conditions. Partial fills
    /// never do.
    #[must_use]
    pub fn is_satisfied_by(&self, report: &ExecutionReport) -> bool {
        if report.order_status == OrdStatus::PartiallyFilled {
            return false;
        }
        let observed = ValidationCondition::new(report.exec_type, report.order_status);
        self.conditions.contains(&observed)
            || (self.accept_cancel && observed == ValidationCondition::CANCELED)
    }

    /// Latest report for `id` satisfying this spec.
    pub fn find_confirmation<'a, I>(&self, id: &str, reports: I) -> Option<ExecutionReport>
    where
        I: IntoIterator<Item = &'a ExecutionReport>,
    {
        let mut matching = reports
            .into_iter()
            .filter(|r| r.refers_to(id) && self.is_satisfied_by(r));
        let first = matching.next()?;
        let latest = matching.fold(first, |best, r| {
            if r.transact_time >= best.transact_time {
                r
            } else {
                best
            }
        });
        Some(latest.clone())
    }
}

/// Broker failures that end a request without confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    /// The target order is in a state that forbids the action.
    InvalidOrdStatus,
    /// The target order is unknown.
    InvalidOrderId,
    /// The quantity is not acceptable.
    InvalidOrderQty,
    /// Not enough balance, and the action cannot be reduced.
    InsufficientBalance,
}

/// Why a request ended unconfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotConfirmedReason {
    /// No confirming report before the deadline.
    Timeout,
    /// Confirmed by the venue, but the broker reply never arrived in time.
    ReplyMissing,
    /// The broker reply carried an error flag.
    ErrorReply,
    /// The broker refused the action.
    Rejected(RejectionKind),
    /// Insufficient balance and the reduced quantity fell below the floor.
    QuantityExhausted,
    /// Fatal failure isolated to this request.
    Aborted(String),
}

/// Result of confirming a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Validation {
    /// The venue reached the expected state; carries the confirming report.
    Confirmed(Box<ExecutionReport>),
    /// The request was not confirmed.
    NotConfirmed(NotConfirmedReason),
}

impl Validation {
    /// Whether the request was confirmed.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// The confirming report.
    #[must_use]
    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            Self::Confirmed(report) => Some(report),
            Self::NotConfirmed(_) => None,
        }
    }

    /// Metric/log label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::NotConfirmed(NotConfirmedReason::Timeout) => "timeout",
            Self::NotConfirmed(NotConfirmedReason::ReplyMissing) => "reply_missing",
            Self::NotConfirmed(NotConfirmedReason::ErrorReply) => "error_reply",
            Self::NotConfirmed(NotConfirmedReason::Rejected(_)) => "rejected",
            Self::NotConfirmed(NotConfirmedReason::QuantityExhausted) => "quantity_exhausted",
            Self::NotConfirmed(NotConfirmedReason::Aborted(_)) => "aborted",
        }
    }
}

/// Exactly one per accepted envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Immediate broker reply, when one was observed.
    pub broker_reply: Option<ExecutionReport>,
    /// The envelope this outcome answers.
    pub envelope: SubmissionEnvelope,
    /// Confirmation result.
    pub validated: Validation,
}

impl ValidationOutcome {
    /// Outcome for a request that never reached a watcher.
    #[must_use]
    pub fn rejected_early(envelope: SubmissionEnvelope, reason: NotConfirmedReason) -> Self {
        Self {
            broker_reply: None,
            envelope,
            validated: Validation::NotConfirmed(reason),
        }
    }

    /// Whether the request was confirmed.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.validated.is_confirmed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{ClientOrderId, VenueOrderId};
    use chrono::{Duration as ChronoDuration, Utc};

    fn report(exec_type: ExecType, status: OrdStatus) -> ExecutionReport {
        ExecutionReport::new(
            ClientOrderId::new("cl-1"),
            VenueOrderId::new("v-1"),
            exec_type,
            status,
        )
    }

    #[test]
    fn trailing_stop_conditionals_confirm_on_acceptance() {
        for kind in [
            OrderKind::Stop,
            OrderKind::StopLimit,
            OrderKind::MarketIfTouched,
            OrderKind::LimitIfTouched,
        ] {
            let spec = ValidationSpec::for_request(kind, SenderKind::TrailingStop);
            assert_eq!(
                spec.conditions(),
                &[ValidationCondition::new(ExecType::New, OrdStatus::New)]
            );
        }
    }

    #[test]
    fn standard_conditionals_confirm_on_fill() {
        let spec = ValidationSpec::for_request(OrderKind::Stop, SenderKind::Standard);
        assert_eq!(
            spec.conditions(),
            &[ValidationCondition::new(ExecType::Trade, OrdStatus::Filled)]
        );
        let limit = ValidationSpec::for_request(OrderKind::Limit, SenderKind::TrailingStop);
        assert_eq!(
            limit.conditions(),
            &[ValidationCondition::new(ExecType::Trade, OrdStatus::Filled)]
        );
    }

    #[test]
    fn amend_and_cancel_specs() {
        let amend = ValidationSpec::for_request(OrderKind::Amend, SenderKind::Standard);
        assert!(amend.is_satisfied_by(&report(ExecType::Replaced, OrdStatus::New)));

        let cancel = ValidationSpec::for_request(OrderKind::Cancel, SenderKind::Standard)
            .without_implicit_cancel();
        assert!(cancel.is_satisfied_by(&report(ExecType::Canceled, OrdStatus::Canceled)));
    }

    #[test]
    fn implicit_cancel_can_be_suppressed() {
        let spec = ValidationSpec::for_request(OrderKind::Limit, SenderKind::Standard);
        let canceled = report(ExecType::Canceled, OrdStatus::Canceled);
        assert!(spec.is_satisfied_by(&canceled));
        assert!(!spec.without_implicit_cancel().is_satisfied_by(&canceled));
    }

    #[test]
    fn partial_fills_never_confirm() {
        let spec = ValidationSpec::new(vec![ValidationCondition::new(
            ExecType::Trade,
            OrdStatus::PartiallyFilled,
        )]);
        assert!(!spec.is_satisfied_by(&report(ExecType::Trade, OrdStatus::PartiallyFilled)));
    }

    #[test]
    fn find_confirmation_picks_latest() {
        let spec = ValidationSpec::for_request(OrderKind::Market, SenderKind::Standard);
        let now = Utc::now();
        let older = report(ExecType::Trade, OrdStatus::Filled).at(now - ChronoDuration::seconds(5));
        let newer = report(ExecType::Trade, OrdStatus::Filled)
            .at(now)
            .with_error("late");
        let other = ExecutionReport::new(
            ClientOrderId::new("cl-2"),
            VenueOrderId::new("v-2"),
            ExecType::Trade,
            OrdStatus::Filled,
        );
        let reports = [older, newer.clone(), other];

        assert_eq!(spec.find_confirmation("cl-1", &reports), Some(newer));
        assert_eq!(spec.find_confirmation("cl-3", &reports), None);
    }

    #[test]
    fn validation_labels() {
        assert_eq!(
            Validation::NotConfirmed(NotConfirmedReason::Timeout).label(),
            "timeout"
        );
        let confirmed = Validation::Confirmed(Box::new(report(ExecType::New, OrdStatus::New)));
        assert!(confirmed.is_confirmed());
        assert!(confirmed.report().is_some());
    }
}
