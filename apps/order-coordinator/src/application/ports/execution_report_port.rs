//! Execution Report Store (Driven Port)
//!
//! Read-only view of the venue's execution report feed.

use crate::domain::ExecutionReport;

/// Continuously appended collection of execution reports.
///
/// Implementations return a consistent snapshot; the coordinator never
/// mutates the store.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionReportStore: Send + Sync {
    /// Snapshot of every report seen so far.
    fn execution_reports(&self) -> Vec<ExecutionReport>;
}
