//! Domain Layer
//!
//! Order commands, envelopes, execution reports and the confirmation rules.
//! No I/O and no async in here.

pub mod envelope;
pub mod order;
pub mod report;
pub mod retry;
pub mod shared;
pub mod validation;

pub use envelope::{RetryContext, SenderKind, SenderRef, SubmissionEnvelope};
pub use order::{
    AmendSpec, CancelSpec, ExecInstructions, OrderCommand, OrderKind, OrderSide, OrderSpec,
    PriceSource,
};
pub use report::{ExecType, ExecutionReport, OrdStatus};
pub use retry::{QuantityReduction, ReductionStep};
pub use shared::{ClientOrderId, Symbol, VenueOrderId};
pub use validation::{
    NotConfirmedReason, RejectionKind, Validation, ValidationCondition, ValidationOutcome,
    ValidationSpec,
};
