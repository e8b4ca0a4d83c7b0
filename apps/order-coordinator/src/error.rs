//! Coordinator errors.
//!
//! Broker and price failures stay typed in their ports. Only failures that
//! escape a request become a [`CoordinatorError`].

use thiserror::Error;

use crate::application::ports::{BrokerError, PriceError};

/// Failure while turning an envelope into a broker call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The broker refused or failed the call.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// A missing price could not be resolved.
    #[error(transparent)]
    Price(#[from] PriceError),
}

impl DispatchError {
    /// Metric/log label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Broker(err) => err.label(),
            Self::Price(_) => "reference_price",
        }
    }
}

/// Errors surfaced by the coordinator handle.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A fatal failure stopped the dispatcher.
    #[error("Fatal failure dispatching {client_order_id}: {source}")]
    Fatal {
        /// The request that failed.
        client_order_id: String,
        /// The failure.
        #[source]
        source: DispatchError,
    },

    /// The coordinator no longer accepts envelopes.
    #[error("Coordinator has stopped")]
    Stopped,

    /// The dispatcher task panicked or was aborted.
    #[error("Dispatcher task failed: {message}")]
    TaskFailed {
        /// Error details.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_display_includes_cause() {
        let err = CoordinatorError::Fatal {
            client_order_id: "cl-1".to_string(),
            source: DispatchError::Broker(BrokerError::InvalidOrder {
                message: "bad side".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "Fatal failure dispatching cl-1: Invalid order: bad side"
        );
    }

    #[test]
    fn price_errors_convert() {
        let err: DispatchError = PriceError::Unavailable {
            symbol: "XBTUSD".to_string(),
        }
        .into();
        assert_eq!(err.label(), "reference_price");
    }
}
