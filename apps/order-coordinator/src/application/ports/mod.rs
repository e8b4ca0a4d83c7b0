//! Application Ports (Driven)
//!
//! Interfaces the coordinator uses to reach the venue:
//! - **Broker**: one call per order kind
//! - **Reference prices**: missing prices and stop offsets
//! - **Execution reports**: the confirmation feed

mod broker_port;
mod execution_report_port;
mod reference_price_port;

#[cfg(test)]
pub use broker_port::MockBrokerPort;
pub use broker_port::{
    AmendOrderRequest, BrokerError, BrokerPort, CancelOrderRequest, PlaceOrderRequest,
};
#[cfg(test)]
pub use execution_report_port::MockExecutionReportStore;
pub use execution_report_port::ExecutionReportStore;
#[cfg(test)]
pub use reference_price_port::MockReferencePricePort;
pub use reference_price_port::{PriceError, ReferencePricePort};
