//! Shared Domain Types
//!
//! Identifiers and serde helpers used across the order model.

pub mod duration_ms;
mod identifiers;

pub use identifiers::{ClientOrderId, Symbol, VenueOrderId};
