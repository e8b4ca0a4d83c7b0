//! Broker Port (Driven Port)
//!
//! Interface for placing, amending and cancelling orders on the venue.
//! Every call returns the venue's immediate acknowledgement as an
//! execution report, or a typed failure.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ClientOrderId, ExecInstructions, ExecutionReport, OrderKind, OrderSide, RejectionKind, Symbol,
    VenueOrderId,
};

/// Request to place a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Client order ID.
    pub client_order_id: ClientOrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Quantity in contracts.
    pub quantity: u64,
    /// Limit price (for limit kinds).
    pub price: Option<Decimal>,
    /// Trigger price (for stop kinds).
    pub stop_price: Option<Decimal>,
    /// Execution instructions.
    pub instructions: ExecInstructions,
}

impl PlaceOrderRequest {
    /// Create a request with no prices and no instructions.
    #[must_use]
    pub fn new(
        client_order_id: ClientOrderId,
        symbol: Symbol,
        side: OrderSide,
        quantity: u64,
    ) -> Self {
        Self {
            client_order_id,
            symbol,
            side,
            quantity,
            price: None,
            stop_price: None,
            instructions: ExecInstructions::default(),
        }
    }

    /// Set the limit price.
    #[must_use]
    pub const fn with_price(mut self, price: Option<Decimal>) -> Self {
        self.price = price;
        self
    }

    /// Set the trigger price.
    #[must_use]
    pub const fn with_stop_price(mut self, stop_price: Option<Decimal>) -> Self {
        self.stop_price = stop_price;
        self
    }

    /// Set the execution instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: ExecInstructions) -> Self {
        self.instructions = instructions;
        self
    }
}

/// Request to amend the price of a resting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendOrderRequest {
    /// Client order ID of the amend request.
    pub client_order_id: ClientOrderId,
    /// Venue order ID of the resting order.
    pub order_id: VenueOrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Side of the resting order.
    pub side: OrderSide,
    /// Kind of the resting order.
    pub amended_kind: OrderKind,
    /// New price.
    pub new_price: Decimal,
    /// Largest price change the venue may apply when adjusting the new
    /// price to the book.
    pub max_price_delta: Decimal,
    /// Free text.
    pub text: Option<String>,
}

/// Request to cancel a resting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    /// Client order ID of the order to cancel.
    pub client_order_id: ClientOrderId,
    /// Instrument.
    pub symbol: Symbol,
}

/// Broker port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// The target order is in a state that forbids the action.
    #[error("Invalid order status: {message}")]
    InvalidOrdStatus {
        /// Error details.
        message: String,
    },

    /// The target order is unknown to the venue.
    #[error("Invalid order id: {message}")]
    InvalidOrderId {
        /// Error details.
        message: String,
    },

    /// The quantity was refused.
    #[error("Invalid order quantity: {message}")]
    InvalidOrderQty {
        /// Error details.
        message: String,
    },

    /// Not enough balance for the requested quantity.
    #[error("Insufficient balance: {message}")]
    InsufficientBalance {
        /// Error details.
        message: String,
    },

    /// The order was malformed.
    #[error("Invalid order: {message}")]
    InvalidOrder {
        /// Error details.
        message: String,
    },

    /// Connection error.
    #[error("Broker connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// Unclassified error.
    #[error("Broker error: {message}")]
    Other {
        /// Error details.
        message: String,
    },
}

impl BrokerError {
    /// The rejection this error maps to in an outcome, if it has one.
    #[must_use]
    pub const fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            Self::InvalidOrdStatus { .. } => Some(RejectionKind::InvalidOrdStatus),
            Self::InvalidOrderId { .. } => Some(RejectionKind::InvalidOrderId),
            Self::InvalidOrderQty { .. } => Some(RejectionKind::InvalidOrderQty),
            Self::InsufficientBalance { .. } => Some(RejectionKind::InsufficientBalance),
            Self::InvalidOrder { .. } | Self::Connection { .. } | Self::Other { .. } => None,
        }
    }

    /// Metric/log label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvalidOrdStatus { .. } => "invalid_ord_status",
            Self::InvalidOrderId { .. } => "invalid_order_id",
            Self::InvalidOrderQty { .. } => "invalid_order_qty",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InvalidOrder { .. } => "invalid_order",
            Self::Connection { .. } => "connection",
            Self::Other { .. } => "other",
        }
    }
}

/// Port for broker interactions. One operation per order kind.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Place a market order.
    async fn place_market(&self, request: PlaceOrderRequest)
    -> Result<ExecutionReport, BrokerError>;

    /// Place a limit order.
    async fn place_limit(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError>;

    /// Place a stop order.
    async fn place_stop(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError>;

    /// Place a stop-limit order.
    async fn place_stop_limit(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError>;

    /// Place a market-if-touched order.
    async fn place_market_if_touched(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError>;

    /// Place a limit-if-touched order.
    async fn place_limit_if_touched(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError>;

    /// Amend the price of a resting order.
    async fn amend(&self, request: AmendOrderRequest) -> Result<ExecutionReport, BrokerError>;

    /// Cancel a resting order.
    async fn cancel(&self, request: CancelOrderRequest) -> Result<ExecutionReport, BrokerError>;
}
