//! Paper venue: an in-memory simulated exchange.
//!
//! Implements every port the coordinator drives. Market orders fill at the
//! touch, limit orders fill at their price (or rest, when configured),
//! conditional orders rest until cancelled. Each order reserves
//! `quantity × price` of the account balance; an order that does not fit
//! fails with insufficient balance.

mod book;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

use crate::application::ports::{
    AmendOrderRequest, BrokerError, BrokerPort, CancelOrderRequest, ExecutionReportStore,
    PlaceOrderRequest, PriceError, ReferencePricePort,
};
use crate::config::{PaperConfig, PaperSymbolConfig};
use crate::domain::{
    ExecInstructions, ExecType, ExecutionReport, OrdStatus, OrderKind, OrderSide, PriceSource,
    Symbol,
};
use crate::infrastructure::reports::InMemoryExecutionReports;

use book::{Book, PaperOrder};

/// Simulated venue.
#[derive(Debug)]
pub struct PaperVenue {
    symbols: RwLock<BTreeMap<String, PaperSymbolConfig>>,
    fill_limit_orders: bool,
    book: Mutex<Book>,
    reports: Arc<InMemoryExecutionReports>,
}

impl PaperVenue {
    /// Create a venue from its configuration.
    #[must_use]
    pub fn new(config: &PaperConfig) -> Self {
        Self {
            symbols: RwLock::new(config.symbols.clone()),
            fill_limit_orders: config.fill_limit_orders,
            book: Mutex::new(Book::new(config.balance)),
            reports: Arc::new(InMemoryExecutionReports::new()),
        }
    }

    /// The report feed this venue appends to.
    #[must_use]
    pub fn reports(&self) -> Arc<InMemoryExecutionReports> {
        Arc::clone(&self.reports)
    }

    /// Balance not reserved or spent.
    #[must_use]
    pub fn available_balance(&self) -> Decimal {
        self.book.lock().available()
    }

    /// Replace the top of book for `symbol`, keeping its other settings.
    /// Unknown symbols are added with a zero stop offset.
    pub fn set_quote(&self, symbol: &str, bid: Decimal, ask: Decimal) {
        let mut symbols = self.symbols.write();
        symbols
            .entry(symbol.to_string())
            .and_modify(|data| {
                data.bid = bid;
                data.ask = ask;
            })
            .or_insert(PaperSymbolConfig {
                bid,
                ask,
                last: None,
                mark: None,
                index: None,
                stop_offset: Decimal::ZERO,
            });
    }

    fn market_data(&self, symbol: &Symbol) -> Option<PaperSymbolConfig> {
        self.symbols.read().get(symbol.as_str()).copied()
    }

    fn publish(&self, order: &PaperOrder, exec_type: ExecType, status: OrdStatus) -> ExecutionReport {
        let report = order.report(exec_type, status);
        self.reports.append(report.clone());
        report
    }

    fn place(
        &self,
        kind: OrderKind,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError> {
        let Some(data) = self.market_data(&request.symbol) else {
            return Err(BrokerError::InvalidOrder {
                message: format!("unknown symbol {}", request.symbol),
            });
        };
        if request.quantity == 0 {
            return Err(BrokerError::InvalidOrderQty {
                message: "quantity must be positive".to_string(),
            });
        }
        if kind.requires_price() && request.price.is_none() {
            return Err(BrokerError::InvalidOrder {
                message: format!("{kind} order without price"),
            });
        }
        if kind.requires_stop_price() && request.stop_price.is_none() {
            return Err(BrokerError::InvalidOrder {
                message: format!("{kind} order without stop price"),
            });
        }

        let touch = request.side.touch(data.bid, data.ask);
        let reference = request.price.or(request.stop_price).unwrap_or(touch);
        let fills_now = match kind {
            OrderKind::Market => true,
            OrderKind::Limit => self.fill_limit_orders,
            _ => false,
        };

        let mut book = self.book.lock();
        let order = book.open(kind, &request, reference)?;
        tracing::debug!(
            client_order_id = %order.client_order_id,
            order_id = %order.order_id,
            kind = %order.kind,
            side = %order.side,
            quantity = order.quantity,
            price = ?order.price,
            stop_price = ?order.stop_price,
            "Paper order accepted"
        );

        let accepted = self.publish(&order, ExecType::New, OrdStatus::New);
        if fills_now {
            let filled = book.fill(&order.order_id).unwrap_or(order);
            Ok(self.publish(&filled, ExecType::Trade, OrdStatus::Filled))
        } else {
            Ok(accepted)
        }
    }
}

#[async_trait]
impl BrokerPort for PaperVenue {
    async fn place_market(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError> {
        self.place(OrderKind::Market, request)
    }

    async fn place_limit(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError> {
        self.place(OrderKind::Limit, request)
    }

    async fn place_stop(&self, request: PlaceOrderRequest) -> Result<ExecutionReport, BrokerError> {
        self.place(OrderKind::Stop, request)
    }

    async fn place_stop_limit(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError> {
        self.place(OrderKind::StopLimit, request)
    }

    async fn place_market_if_touched(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError> {
        self.place(OrderKind::MarketIfTouched, request)
    }

    async fn place_limit_if_touched(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<ExecutionReport, BrokerError> {
        self.place(OrderKind::LimitIfTouched, request)
    }

    async fn amend(&self, request: AmendOrderRequest) -> Result<ExecutionReport, BrokerError> {
        let amended = self.book.lock().amend(&request)?;
        tracing::debug!(
            order_id = %amended.order_id,
            price = ?amended.price,
            stop_price = ?amended.stop_price,
            "Paper order amended"
        );
        Ok(self.publish(&amended, ExecType::Replaced, OrdStatus::New))
    }

    async fn cancel(&self, request: CancelOrderRequest) -> Result<ExecutionReport, BrokerError> {
        let canceled = self.book.lock().cancel(&request.client_order_id)?;
        Ok(self.publish(&canceled, ExecType::Canceled, OrdStatus::Canceled))
    }
}

#[async_trait]
impl ReferencePricePort for PaperVenue {
    async fn reference_price(
        &self,
        symbol: &Symbol,
        _side: OrderSide,
        instructions: &ExecInstructions,
    ) -> Result<Decimal, PriceError> {
        let data = self.market_data(symbol).ok_or_else(|| PriceError::Unavailable {
            symbol: symbol.to_string(),
        })?;
        let price = match instructions.price_source() {
            PriceSource::Last => data.last,
            PriceSource::Mark => data.mark,
            PriceSource::Index => data.index,
            PriceSource::Mid => None,
        };
        Ok(price.unwrap_or_else(|| data.mid()))
    }

    async fn default_stop_offset(&self, symbol: &Symbol) -> Result<Decimal, PriceError> {
        self.market_data(symbol)
            .map(|data| data.stop_offset)
            .ok_or_else(|| PriceError::NoStopOffset {
                symbol: symbol.to_string(),
            })
    }
}

impl ExecutionReportStore for PaperVenue {
    fn execution_reports(&self) -> Vec<ExecutionReport> {
        self.reports.execution_reports()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientOrderId, VenueOrderId};
    use rust_decimal_macros::dec;

    fn venue(balance: Decimal, fill_limit_orders: bool) -> PaperVenue {
        PaperVenue::new(&PaperConfig {
            balance,
            fill_limit_orders,
            ..PaperConfig::default()
        })
    }

    fn request(id: &str, side: OrderSide, quantity: u64) -> PlaceOrderRequest {
        PlaceOrderRequest::new(ClientOrderId::new(id), Symbol::new("XBTUSD"), side, quantity)
    }

    #[tokio::test]
    async fn market_order_fills_at_touch() {
        let venue = venue(dec!(1000000), true);
        let reply = venue
            .place_market(request("cl-1", OrderSide::Buy, 10))
            .await
            .unwrap();

        assert_eq!(reply.exec_type, ExecType::Trade);
        assert_eq!(reply.order_status, OrdStatus::Filled);
        assert_eq!(venue.reports().len(), 2);
        assert_eq!(venue.available_balance(), dec!(1000000) - dec!(95005));
    }

    #[tokio::test]
    async fn insufficient_balance_is_reported() {
        let venue = venue(dec!(1000), true);
        let err = venue
            .place_market(request("cl-1", OrderSide::Sell, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InsufficientBalance { .. }));
        assert!(venue.reports().is_empty());
    }

    #[tokio::test]
    async fn resting_limit_can_be_amended_and_canceled() {
        let venue = venue(dec!(1000000), false);
        let ack = venue
            .place_limit(request("cl-1", OrderSide::Buy, 10).with_price(Some(dec!(9400))))
            .await
            .unwrap();
        assert_eq!(ack.order_status, OrdStatus::New);
        assert_eq!(venue.available_balance(), dec!(906000));

        let amended = venue
            .amend(AmendOrderRequest {
                client_order_id: ClientOrderId::new("cl-amend"),
                order_id: ack.order_id.clone(),
                symbol: Symbol::new("XBTUSD"),
                side: OrderSide::Buy,
                amended_kind: OrderKind::Limit,
                new_price: dec!(9450),
                max_price_delta: dec!(0.5),
                text: None,
            })
            .await
            .unwrap();
        assert_eq!(amended.exec_type, ExecType::Replaced);
        assert_eq!(amended.client_order_id, ClientOrderId::new("cl-1"));

        let canceled = venue
            .cancel(CancelOrderRequest {
                client_order_id: ClientOrderId::new("cl-1"),
                symbol: Symbol::new("XBTUSD"),
            })
            .await
            .unwrap();
        assert_eq!(canceled.order_status, OrdStatus::Canceled);
        assert_eq!(venue.available_balance(), dec!(1000000));

        let again = venue
            .cancel(CancelOrderRequest {
                client_order_id: ClientOrderId::new("cl-1"),
                symbol: Symbol::new("XBTUSD"),
            })
            .await
            .unwrap_err();
        assert!(matches!(again, BrokerError::InvalidOrdStatus { .. }));
    }

    #[tokio::test]
    async fn amend_of_unknown_order_fails() {
        let venue = venue(dec!(1000000), false);
        let err = venue
            .amend(AmendOrderRequest {
                client_order_id: ClientOrderId::new("cl-amend"),
                order_id: VenueOrderId::new("nope"),
                symbol: Symbol::new("XBTUSD"),
                side: OrderSide::Sell,
                amended_kind: OrderKind::Limit,
                new_price: dec!(9600),
                max_price_delta: dec!(0.5),
                text: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidOrderId { .. }));
    }

    #[tokio::test]
    async fn conditional_orders_need_a_trigger() {
        let venue = venue(dec!(1000000), true);
        let err = venue
            .place_stop(request("cl-1", OrderSide::Sell, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidOrder { .. }));

        let ack = venue
            .place_stop(request("cl-2", OrderSide::Sell, 1).with_stop_price(Some(dec!(9000))))
            .await
            .unwrap();
        assert_eq!((ack.exec_type, ack.order_status), (ExecType::New, OrdStatus::New));
    }

    #[tokio::test]
    async fn reference_prices_follow_instructions() {
        let venue = venue(dec!(1000000), true);
        let symbol = Symbol::new("XBTUSD");
        venue.set_quote("XBTUSD", dec!(100), dec!(102));

        let mid = venue
            .reference_price(&symbol, OrderSide::Buy, &ExecInstructions::default())
            .await
            .unwrap();
        let last = venue
            .reference_price(&symbol, OrderSide::Buy, &ExecInstructions::new(["LastPrice"]))
            .await
            .unwrap();
        assert_eq!(mid, dec!(101));
        assert_eq!(last, dec!(101));
        assert_eq!(venue.default_stop_offset(&symbol).await.unwrap(), dec!(0.5));

        let unknown = venue
            .default_stop_offset(&Symbol::new("DOGEUSD"))
            .await
            .unwrap_err();
        assert!(matches!(unknown, PriceError::NoStopOffset { .. }));
    }
}
