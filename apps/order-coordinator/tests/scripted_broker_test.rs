//! Coordinator behaviour against a scripted venue.
//!
//! The scripted venue decides what to do from the client order id prefix,
//! which makes reply flags, missing reports and broker failures easy to
//! provoke.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_stream::StreamExt;

use order_coordinator::application::ports::{
    AmendOrderRequest, BrokerError, BrokerPort, CancelOrderRequest, ExecutionReportStore,
    PlaceOrderRequest, PriceError, ReferencePricePort,
};
use order_coordinator::config::CoordinatorConfig;
use order_coordinator::domain::{
    AmendSpec, CancelSpec, ClientOrderId, ExecInstructions, ExecType, ExecutionReport,
    NotConfirmedReason, OrdStatus, OrderCommand, OrderKind, OrderSide, OrderSpec,
    RejectionKind, Symbol, Validation, ValidationOutcome, VenueOrderId,
};
use order_coordinator::infrastructure::InMemoryExecutionReports;
use order_coordinator::{OrderCoordinator, SubmissionEnvelope};

// =============================================================================
// Scripted venue
// =============================================================================

#[derive(Default)]
struct ScriptedVenue {
    reports: InMemoryExecutionReports,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedVenue {
    fn report(id: &ClientOrderId, exec_type: ExecType, status: OrdStatus) -> ExecutionReport {
        ExecutionReport::new(
            id.clone(),
            VenueOrderId::new(format!("v-{id}")),
            exec_type,
            status,
        )
    }

    async fn place(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push(request.client_order_id.as_str().to_string());
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let id = &request.client_order_id;
        let filled = Self::report(id, ExecType::Trade, OrdStatus::Filled);
        match id.as_str() {
            s if s.starts_with("err-") => {
                self.reports.append(filled.clone());
                Ok(filled.with_error("overloaded"))
            }
            s if s.starts_with("silent-") => Ok(Self::report(id, ExecType::New, OrdStatus::New)),
            s if s.starts_with("down-") => Err(BrokerError::Connection {
                message: "socket closed".to_string(),
            }),
            s if s.starts_with("cxl-") => {
                let canceled = Self::report(id, ExecType::Canceled, OrdStatus::Canceled);
                self.reports.append(canceled.clone());
                Ok(canceled)
            }
            _ => {
                self.reports.append(filled.clone());
                Ok(filled)
            }
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerPort for ScriptedVenue {
    async fn place_market(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError> {
        self.place(request).await
    }

    async fn place_limit(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError> {
        self.place(request).await
    }

    async fn place_stop(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError> {
        self.place(request).await
    }

    async fn place_stop_limit(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError> {
        self.place(request).await
    }

    async fn place_market_if_touched(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError> {
        self.place(request).await
    }

    async fn place_limit_if_touched(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError> {
        self.place(request).await
    }

    async fn amend(&self, _request: AmendOrderRequest) -> Result<ExecutionReport, BrokerError> {
        Err(BrokerError::InvalidOrdStatus {
            message: "order already filled".to_string(),
        })
    }

    async fn cancel(&self, request: CancelOrderRequest) -> Result<ExecutionReport, BrokerError> {
        Ok(Self::report(
            &request.client_order_id,
            ExecType::Canceled,
            OrdStatus::Canceled,
        ))
    }
}

#[async_trait]
impl ReferencePricePort for ScriptedVenue {
    async fn reference_price(
        &self,
        symbol: &Symbol,
        _side: OrderSide,
        _instructions: &ExecInstructions,
    ) -> Result<Decimal, PriceError> {
        if symbol.as_str() == "NOPX" {
            return Err(PriceError::Unavailable {
                symbol: symbol.to_string(),
            });
        }
        Ok(dec!(100))
    }

    async fn default_stop_offset(&self, _symbol: &Symbol) -> Result<Decimal, PriceError> {
        Ok(dec!(1))
    }
}

impl ExecutionReportStore for ScriptedVenue {
    fn execution_reports(&self) -> Vec<ExecutionReport> {
        self.reports.execution_reports()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        poll_interval_ms: 5,
        market_timeout_secs: None,
        cancel_timeout_secs: None,
        ..CoordinatorConfig::default()
    }
}

fn market(id: &str) -> SubmissionEnvelope {
    SubmissionEnvelope::new(
        ClientOrderId::new(id),
        Symbol::new("XBTUSD"),
        OrderCommand::Market(OrderSpec::new(OrderSide::Buy, 1)),
        Duration::from_millis(200),
    )
}

async fn run(
    venue: &Arc<ScriptedVenue>,
    config: CoordinatorConfig,
    envelopes: Vec<SubmissionEnvelope>,
) -> Vec<ValidationOutcome> {
    let broker: Arc<dyn BrokerPort> = venue.clone();
    let prices: Arc<dyn ReferencePricePort> = venue.clone();
    let reports: Arc<dyn ExecutionReportStore> = venue.clone();
    let (handle, outcomes) = OrderCoordinator::new(broker, prices, reports, config).start();

    for envelope in envelopes {
        handle.submit_order(envelope).unwrap();
    }
    handle.join().await.unwrap();
    outcomes.collect().await
}

fn outcome_for<'a>(outcomes: &'a [ValidationOutcome], id: &str) -> &'a ValidationOutcome {
    outcomes
        .iter()
        .find(|o| o.envelope.client_order_id.as_str() == id)
        .unwrap_or_else(|| panic!("no outcome for {id}"))
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn broker_calls_are_serialized_in_arrival_order() {
    let venue = Arc::new(ScriptedVenue::default());
    let ids: Vec<String> = (0..8).map(|i| format!("cl-{i}")).collect();

    let outcomes = run(&venue, config(), ids.iter().map(|id| market(id)).collect()).await;

    assert_eq!(outcomes.len(), ids.len());
    assert_eq!(venue.calls(), ids);
    assert_eq!(venue.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_flagged_reply_is_not_a_confirmation() {
    let venue = Arc::new(ScriptedVenue::default());
    let outcomes = run(&venue, config(), vec![market("err-1")]).await;

    assert_eq!(
        outcomes[0].validated,
        Validation::NotConfirmed(NotConfirmedReason::ErrorReply)
    );
    assert!(outcomes[0].broker_reply.as_ref().unwrap().is_error);
}

#[tokio::test]
async fn acknowledged_order_without_report_times_out() {
    let venue = Arc::new(ScriptedVenue::default());
    let outcomes = run(&venue, config(), vec![market("silent-1")]).await;

    assert_eq!(
        outcomes[0].validated,
        Validation::NotConfirmed(NotConfirmedReason::Timeout)
    );
    assert_eq!(
        outcomes[0].broker_reply.as_ref().unwrap().exec_type,
        ExecType::New
    );
}

#[tokio::test]
async fn cancel_reply_confirms_when_the_store_is_silent() {
    let venue = Arc::new(ScriptedVenue::default());
    let cancel = SubmissionEnvelope::new(
        ClientOrderId::new("cancel-1"),
        Symbol::new("XBTUSD"),
        OrderCommand::Cancel(CancelSpec {
            client_order_id: ClientOrderId::new("resting-1"),
        }),
        Duration::from_millis(50),
    );

    let outcomes = run(&venue, config(), vec![cancel]).await;
    let report = outcomes[0].validated.report().unwrap();
    assert_eq!(report.order_status, OrdStatus::Canceled);
    assert_eq!(report.client_order_id, ClientOrderId::new("resting-1"));
}

#[tokio::test]
async fn canceled_report_confirms_only_when_enabled() {
    let venue = Arc::new(ScriptedVenue::default());
    let outcomes = run(&venue, config(), vec![market("cxl-1")]).await;
    assert_eq!(
        outcomes[0].validated,
        Validation::NotConfirmed(NotConfirmedReason::Timeout)
    );

    let venue = Arc::new(ScriptedVenue::default());
    let accepting = CoordinatorConfig {
        accept_cancel_as_confirmation: true,
        ..config()
    };
    let outcomes = run(&venue, accepting, vec![market("cxl-2")]).await;
    let report = outcomes[0].validated.report().unwrap();
    assert_eq!(report.exec_type, ExecType::Canceled);
}

#[tokio::test]
async fn rejected_amend_and_failed_lookups_do_not_stop_dispatch() {
    let venue = Arc::new(ScriptedVenue::default());
    let amend = SubmissionEnvelope::new(
        ClientOrderId::new("amend-1"),
        Symbol::new("XBTUSD"),
        OrderCommand::Amend(AmendSpec {
            side: OrderSide::Sell,
            order_id: VenueOrderId::new("v-resting"),
            new_price: dec!(101),
            amended_kind: OrderKind::Limit,
            text: Some("trail".to_string()),
        }),
        Duration::from_millis(50),
    );
    let no_price = SubmissionEnvelope::new(
        ClientOrderId::new("limit-1"),
        Symbol::new("NOPX"),
        OrderCommand::Limit(OrderSpec::new(OrderSide::Buy, 1)),
        Duration::from_millis(50),
    );

    let outcomes = run(
        &venue,
        config(),
        vec![amend, no_price, market("down-1"), market("cl-1")],
    )
    .await;

    assert_eq!(outcomes.len(), 4);
    assert_eq!(
        outcome_for(&outcomes, "amend-1").validated,
        Validation::NotConfirmed(NotConfirmedReason::Rejected(
            RejectionKind::InvalidOrdStatus
        ))
    );
    assert!(matches!(
        outcome_for(&outcomes, "limit-1").validated,
        Validation::NotConfirmed(NotConfirmedReason::Aborted(_))
    ));
    assert!(matches!(
        outcome_for(&outcomes, "down-1").validated,
        Validation::NotConfirmed(NotConfirmedReason::Aborted(_))
    ));
    assert!(outcome_for(&outcomes, "cl-1").is_confirmed());
    assert_eq!(venue.calls(), vec!["down-1".to_string(), "cl-1".to_string()]);
}
