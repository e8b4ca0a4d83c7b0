//! Execution reports published by the venue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{ClientOrderId, VenueOrderId};

/// Venue event kind (FIX tag 150 semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecType {
    /// Order accepted.
    New,
    /// Fill (partial or complete).
    Trade,
    /// Order canceled.
    Canceled,
    /// Order replaced (amended).
    Replaced,
    /// Conditional order triggered.
    Triggered,
    /// Order rejected.
    Rejected,
    /// Order expired.
    Expired,
}

/// Resulting order state (FIX tag 39 semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrdStatus {
    /// Resting on the book or waiting for its trigger.
    New,
    /// Partially filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Canceled.
    Canceled,
    /// Rejected.
    Rejected,
    /// Expired.
    Expired,
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Trade => "TRADE",
            Self::Canceled => "CANCELED",
            Self::Replaced => "REPLACED",
            Self::Triggered => "TRIGGERED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

impl fmt::Display for OrdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// A single order lifecycle event. Immutable once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Client order id.
    pub client_order_id: ClientOrderId,
    /// Venue order id.
    pub order_id: VenueOrderId,
    /// Event kind.
    pub exec_type: ExecType,
    /// Order state after the event.
    pub order_status: OrdStatus,
    /// Venue transaction time.
    pub transact_time: DateTime<Utc>,
    /// Set when the venue flagged this report as an error.
    #[serde(default)]
    pub is_error: bool,
    /// Venue free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ExecutionReport {
    /// Create a report stamped with the current time.
    #[must_use]
    pub fn new(
        client_order_id: ClientOrderId,
        order_id: VenueOrderId,
        exec_type: ExecType,
        order_status: OrdStatus,
    ) -> Self {
        Self {
            client_order_id,
            order_id,
            exec_type,
            order_status,
            transact_time: Utc::now(),
            is_error: false,
            text: None,
        }
    }

    /// Mark the report as an error.
    #[must_use]
    pub fn with_error(mut self, text: impl Into<String>) -> Self {
        self.is_error = true;
        self.text = Some(text.into());
        self
    }

    /// Set the transaction time.
    #[must_use]
    pub const fn at(mut self, transact_time: DateTime<Utc>) -> Self {
        self.transact_time = transact_time;
        self
    }

    /// True when either id of this report equals `id`.
    #[must_use]
    pub fn refers_to(&self, id: &str) -> bool {
        self.client_order_id.as_str() == id || self.order_id.as_str() == id
    }
}
