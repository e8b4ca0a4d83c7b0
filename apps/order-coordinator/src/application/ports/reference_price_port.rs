//! Reference Price Port (Driven Port)
//!
//! Prices used when a request leaves its price or trigger price out.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{ExecInstructions, OrderSide, Symbol};

/// Reference price error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// No price is known for the symbol.
    #[error("No reference price for {symbol}")]
    Unavailable {
        /// The symbol.
        symbol: String,
    },

    /// No offset is configured for the symbol.
    #[error("No stop offset configured for {symbol}")]
    NoStopOffset {
        /// The symbol.
        symbol: String,
    },

    /// Price source error.
    #[error("Price source error: {message}")]
    Source {
        /// Error details.
        message: String,
    },
}

/// Port for reference prices and per-symbol price offsets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferencePricePort: Send + Sync {
    /// Price to use for an order on `side`, from the source selected by
    /// `instructions` (see [`ExecInstructions::price_source`]).
    async fn reference_price(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        instructions: &ExecInstructions,
    ) -> Result<Decimal, PriceError>;

    /// Absolute distance between a price and its default trigger price.
    /// Also the allowed price delta for amends.
    async fn default_stop_offset(&self, symbol: &Symbol) -> Result<Decimal, PriceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PriceError::Unavailable {
            symbol: "XBTUSD".to_string(),
        };
        assert_eq!(err.to_string(), "No reference price for XBTUSD");
    }
}
