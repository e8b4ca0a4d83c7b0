//! Submission envelopes: one producer request for one venue action.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::order::OrderCommand;
use crate::domain::shared::{ClientOrderId, Symbol, duration_ms};

/// What kind of producer sent the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderKind {
    /// Regular order producer.
    #[default]
    Standard,
    /// Trailing-stop manager. Its conditional orders are confirmed on
    /// acceptance rather than on fill.
    TrailingStop,
}

/// Opaque reference to the producer of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRef {
    /// Producer kind.
    #[serde(default)]
    pub kind: SenderKind,
    /// Producer name, for logs.
    #[serde(default)]
    pub name: String,
}

impl SenderRef {
    /// A standard producer.
    #[must_use]
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            kind: SenderKind::Standard,
            name: name.into(),
        }
    }

    /// A trailing-stop producer.
    #[must_use]
    pub fn trailing_stop(name: impl Into<String>) -> Self {
        Self {
            kind: SenderKind::TrailingStop,
            name: name.into(),
        }
    }
}

/// State carried across insufficient-balance resubmissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryContext {
    /// Number of quantity reductions already applied.
    pub reductions: u32,
    /// Quantity of the first submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_quantity: Option<u64>,
}

/// A request to perform one venue action and confirm it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEnvelope {
    /// Producer of this request.
    #[serde(default)]
    pub sender: SenderRef,
    /// Confirmation deadline, relative to dispatch.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Instrument.
    pub symbol: Symbol,
    /// The venue action.
    pub command: OrderCommand,
    /// Unique among envelopes in flight.
    pub client_order_id: ClientOrderId,
    /// Resubmission state.
    #[serde(default)]
    pub retry: RetryContext,
}

impl SubmissionEnvelope {
    /// Create an envelope from a standard sender.
    #[must_use]
    pub fn new(
        client_order_id: ClientOrderId,
        symbol: Symbol,
        command: OrderCommand,
        timeout: Duration,
    ) -> Self {
        Self {
            sender: SenderRef::default(),
            timeout,
            symbol,
            command,
            client_order_id,
            retry: RetryContext::default(),
        }
    }

    /// Set the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: SenderRef) -> Self {
        self.sender = sender;
        self
    }

    /// Id carried by the execution reports that confirm this request: the
    /// target order for amends and cancels, the envelope's own id otherwise.
    #[must_use]
    pub fn watched_id(&self) -> &str {
        match &self.command {
            OrderCommand::Amend(spec) => spec.order_id.as_str(),
            OrderCommand::Cancel(spec) => spec.client_order_id.as_str(),
            _ => self.client_order_id.as_str(),
        }
    }

    /// Next envelope of the insufficient-balance path: same id, reduced
    /// quantity, one more reduction recorded.
    #[must_use]
    pub fn resubmitted_with(&self, quantity: u64) -> Self {
        let mut next = self.clone();
        next.command = self.command.with_quantity(quantity);
        next.retry = RetryContext {
            reductions: self.retry.reductions + 1,
            requested_quantity: self.retry.requested_quantity.or(self.command.quantity()),
        };
        next
    }
}
