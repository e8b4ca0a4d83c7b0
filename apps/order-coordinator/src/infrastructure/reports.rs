//! In-memory execution report store.

use parking_lot::RwLock;

use crate::application::ports::ExecutionReportStore;
use crate::domain::ExecutionReport;

/// Append-only report store.
#[derive(Debug, Default)]
pub struct InMemoryExecutionReports {
    reports: RwLock<Vec<ExecutionReport>>,
}

impl InMemoryExecutionReports {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a report.
    pub fn append(&self, report: ExecutionReport) {
        tracing::debug!(
            client_order_id = %report.client_order_id,
            order_id = %report.order_id,
            exec_type = %report.exec_type,
            order_status = %report.order_status,
            "Execution report"
        );
        self.reports.write().push(report);
    }

    /// Number of reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    /// True when no report was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

impl ExecutionReportStore for InMemoryExecutionReports {
    fn execution_reports(&self) -> Vec<ExecutionReport> {
        self.reports.read().clone()
    }
}
