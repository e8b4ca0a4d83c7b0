// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Coordinator - Rust Core Library
//!
//! Serializes order submissions to a single venue connection and confirms
//! each submission against the venue's execution reports.
//!
//! # Architecture
//!
//! - **Domain**: commands, envelopes, execution reports, confirmation rules
//!   and the insufficient-balance quantity reduction
//! - **Application**: the coordinator (dispatcher, watchers, reply routing)
//!   and the ports it drives (`BrokerPort`, `ReferencePricePort`,
//!   `ExecutionReportStore`)
//! - **Infrastructure**: in-memory report store and a paper venue
//!
//! # Guarantees
//!
//! - One broker call in flight at a time
//! - Exactly one [`ValidationOutcome`] per accepted envelope
//! - Every outcome is produced within its envelope's deadline

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - core types and rules, no I/O.
pub mod domain;

/// Application layer - the coordinator and its ports.
pub mod application;

/// Infrastructure layer - adapters.
pub mod infrastructure;

/// Configuration loading.
pub mod config;

/// Error types.
pub mod error;

/// Prometheus metrics.
pub mod observability;

/// Logging and tracing setup.
pub mod telemetry;

pub use application::{CoordinatorHandle, OrderCoordinator, OrderSubmitter, OutcomeStream};
pub use domain::{SubmissionEnvelope, Validation, ValidationOutcome};
pub use error::{CoordinatorError, DispatchError};
