//! Infrastructure Layer
//!
//! Adapters for the application ports:
//!
//! - `reports`: in-memory execution report store
//! - `paper`: simulated venue (broker, reference prices, report feed)

pub mod paper;
pub mod reports;

pub use paper::PaperVenue;
pub use reports::InMemoryExecutionReports;
