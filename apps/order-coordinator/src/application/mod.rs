//! Application Layer
//!
//! The coordinator and the ports it drives.

pub mod coordinator;
pub mod ports;

pub use coordinator::{CoordinatorHandle, OrderCoordinator, OrderSubmitter, OutcomeStream};
