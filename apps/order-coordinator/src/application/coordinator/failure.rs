//! Broker failure policy, applied by the dispatcher before a watcher exists.
//!
//! | Failure | Action |
//! |---------|--------|
//! | invalid status / invalid id on amend | reject |
//! | invalid status / invalid id otherwise | fatal |
//! | invalid quantity | reject |
//! | insufficient balance | reduce and resubmit, or give up below the floor |
//! | invalid order, anything else | fatal |

use crate::application::ports::BrokerError;
use crate::domain::{NotConfirmedReason, OrderKind, QuantityReduction, ReductionStep};
use crate::error::DispatchError;

/// What the dispatcher does next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FailureAction {
    /// Send the same request again with this quantity.
    Resubmit(u64),
    /// Emit a non-confirmed outcome and move on.
    Reject(NotConfirmedReason),
    /// Hand to the fatal policy.
    Fatal,
}

/// Classify a failure for a request of `kind` that sent `quantity`.
pub(crate) fn classify(
    kind: OrderKind,
    quantity: Option<u64>,
    error: &DispatchError,
    reduction: &QuantityReduction,
) -> FailureAction {
    let DispatchError::Broker(broker_error) = error else {
        return FailureAction::Fatal;
    };
    let rejected = || {
        broker_error
            .rejection_kind()
            .map_or(FailureAction::Fatal, |rejection| {
                FailureAction::Reject(NotConfirmedReason::Rejected(rejection))
            })
    };

    match broker_error {
        BrokerError::InvalidOrdStatus { .. } | BrokerError::InvalidOrderId { .. } => {
            if kind == OrderKind::Amend {
                rejected()
            } else {
                FailureAction::Fatal
            }
        }
        BrokerError::InvalidOrderQty { .. } => rejected(),
        BrokerError::InsufficientBalance { .. } => match quantity {
            Some(quantity) => match reduction.next_step(quantity) {
                ReductionStep::Resubmit(reduced) => FailureAction::Resubmit(reduced),
                ReductionStep::GiveUp { .. } => {
                    FailureAction::Reject(NotConfirmedReason::QuantityExhausted)
                }
            },
            None => rejected(),
        },
        BrokerError::InvalidOrder { .. }
        | BrokerError::Connection { .. }
        | BrokerError::Other { .. } => FailureAction::Fatal,
    }
}
