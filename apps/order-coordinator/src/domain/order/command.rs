//! Order commands accepted by the coordinator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ExecInstructions, OrderSide};
use crate::domain::shared::{ClientOrderId, VenueOrderId};

/// Kind of venue action a command maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Market order.
    Market,
    /// Limit order.
    Limit,
    /// Stop (market) order.
    Stop,
    /// Stop-limit order.
    StopLimit,
    /// Market-if-touched order.
    MarketIfTouched,
    /// Limit-if-touched order.
    LimitIfTouched,
    /// Price amendment of a resting order.
    Amend,
    /// Cancellation of a resting order.
    Cancel,
}

impl OrderKind {
    /// Kinds that rest with a limit price.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit | Self::LimitIfTouched)
    }

    /// Kinds that carry a trigger (stop) price.
    #[must_use]
    pub const fn requires_stop_price(&self) -> bool {
        matches!(
            self,
            Self::Stop | Self::StopLimit | Self::MarketIfTouched | Self::LimitIfTouched
        )
    }

    /// Protective or conditional kinds: accepted by the venue long before
    /// they fill.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        self.requires_stop_price()
    }

    /// Metric/log label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::Stop => "stop",
            Self::StopLimit => "stop_limit",
            Self::MarketIfTouched => "market_if_touched",
            Self::LimitIfTouched => "limit_if_touched",
            Self::Amend => "amend",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Order side.
    pub side: OrderSide,
    /// Quantity in contracts.
    pub quantity: u64,
    /// Limit price; looked up from the venue when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Trigger price; derived from the price when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Distance between price and derived stop price, overriding the
    /// symbol default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_offset: Option<Decimal>,
    /// Venue execution instructions.
    #[serde(default)]
    pub instructions: ExecInstructions,
}

impl OrderSpec {
    /// Create an order spec with no prices and no instructions.
    #[must_use]
    pub fn new(side: OrderSide, quantity: u64) -> Self {
        Self {
            side,
            quantity,
            price: None,
            stop_price: None,
            stop_offset: None,
            instructions: ExecInstructions::default(),
        }
    }

    /// Set the limit price.
    #[must_use]
    pub const fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the stop price.
    #[must_use]
    pub const fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Override the stop offset.
    #[must_use]
    pub const fn with_stop_offset(mut self, offset: Decimal) -> Self {
        self.stop_offset = Some(offset);
        self
    }

    /// Set the execution instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: ExecInstructions) -> Self {
        self.instructions = instructions;
        self
    }
}

/// Price amendment of an order resting on the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendSpec {
    /// Side of the resting order.
    pub side: OrderSide,
    /// Venue id of the order to amend.
    pub order_id: VenueOrderId,
    /// New price (limit price, or trigger price for stop kinds).
    pub new_price: Decimal,
    /// Kind of the order being amended.
    pub amended_kind: OrderKind,
    /// Free text forwarded to the venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Cancellation of an order resting on the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSpec {
    /// Client order id of the order to cancel.
    pub client_order_id: ClientOrderId,
}

/// A command for the venue. Exactly one broker call is made per command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCommand {
    /// Market order.
    Market(OrderSpec),
    /// Limit order.
    Limit(OrderSpec),
    /// Stop order.
    Stop(OrderSpec),
    /// Stop-limit order.
    StopLimit(OrderSpec),
    /// Market-if-touched order.
    MarketIfTouched(OrderSpec),
    /// Limit-if-touched order.
    LimitIfTouched(OrderSpec),
    /// Amend the price of a resting order.
    Amend(AmendSpec),
    /// Cancel a resting order.
    Cancel(CancelSpec),
}

impl OrderCommand {
    /// The kind of this command.
    #[must_use]
    pub const fn kind(&self) -> OrderKind {
        match self {
            Self::Market(_) => OrderKind::Market,
            Self::Limit(_) => OrderKind::Limit,
            Self::Stop(_) => OrderKind::Stop,
            Self::StopLimit(_) => OrderKind::StopLimit,
            Self::MarketIfTouched(_) => OrderKind::MarketIfTouched,
            Self::LimitIfTouched(_) => OrderKind::LimitIfTouched,
            Self::Amend(_) => OrderKind::Amend,
            Self::Cancel(_) => OrderKind::Cancel,
        }
    }

    /// The order spec for placement commands.
    #[must_use]
    pub const fn order_spec(&self) -> Option<&OrderSpec> {
        match self {
            Self::Market(spec)
            | Self::Limit(spec)
            | Self::Stop(spec)
            | Self::StopLimit(spec)
            | Self::MarketIfTouched(spec)
            | Self::LimitIfTouched(spec) => Some(spec),
            Self::Amend(_) | Self::Cancel(_) => None,
        }
    }

    /// Quantity sent to the venue, for placement commands.
    #[must_use]
    pub fn quantity(&self) -> Option<u64> {
        self.order_spec().map(|spec| spec.quantity)
    }

    /// Copy of this command with a different quantity. Amend and cancel
    /// commands carry no quantity and are returned unchanged.
    #[must_use]
    pub fn with_quantity(&self, quantity: u64) -> Self {
        let mut command = self.clone();
        match &mut command {
            Self::Market(spec)
            | Self::Limit(spec)
            | Self::Stop(spec)
            | Self::StopLimit(spec)
            | Self::MarketIfTouched(spec)
            | Self::LimitIfTouched(spec) => spec.quantity = quantity,
            Self::Amend(_) | Self::Cancel(_) => {}
        }
        command
    }
}
