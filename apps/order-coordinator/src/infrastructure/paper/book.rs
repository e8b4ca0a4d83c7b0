//! Paper order book and account balance.

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::application::ports::{AmendOrderRequest, BrokerError, PlaceOrderRequest};
use crate::domain::{
    ClientOrderId, ExecType, ExecutionReport, OrdStatus, OrderKind, OrderSide, VenueOrderId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum OrderState {
    Resting,
    Filled,
    Canceled,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resting => "resting",
            Self::Filled => "filled",
            Self::Canceled => "canceled",
        })
    }
}

#[derive(Debug, Clone)]
pub(super) struct PaperOrder {
    pub client_order_id: ClientOrderId,
    pub order_id: VenueOrderId,
    pub kind: OrderKind,
    pub side: OrderSide,
    pub quantity: u64,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    reserved: Decimal,
    state: OrderState,
}

impl PaperOrder {
    pub fn report(&self, exec_type: ExecType, status: OrdStatus) -> ExecutionReport {
        ExecutionReport::new(
            self.client_order_id.clone(),
            self.order_id.clone(),
            exec_type,
            status,
        )
    }

    fn ensure_resting(&self) -> Result<(), BrokerError> {
        if self.state == OrderState::Resting {
            Ok(())
        } else {
            Err(BrokerError::InvalidOrdStatus {
                message: format!("order {} is {}", self.order_id, self.state),
            })
        }
    }
}

#[derive(Debug)]
pub(super) struct Book {
    available: Decimal,
    orders: HashMap<VenueOrderId, PaperOrder>,
    by_client: HashMap<ClientOrderId, VenueOrderId>,
}

impl Book {
    pub fn new(balance: Decimal) -> Self {
        Self {
            available: balance,
            orders: HashMap::new(),
            by_client: HashMap::new(),
        }
    }

    pub const fn available(&self) -> Decimal {
        self.available
    }

    fn reserve(&mut self, amount: Decimal) -> Result<(), BrokerError> {
        if amount > self.available {
            return Err(BrokerError::InsufficientBalance {
                message: format!("order needs {amount}, available {}", self.available),
            });
        }
        self.available -= amount;
        Ok(())
    }

    /// Accept a new order priced at `reference`, reserving its notional.
    pub fn open(
        &mut self,
        kind: OrderKind,
        request: &PlaceOrderRequest,
        reference: Decimal,
    ) -> Result<PaperOrder, BrokerError> {
        let notional = Decimal::from(request.quantity) * reference;
        self.reserve(notional)?;

        let order = PaperOrder {
            client_order_id: request.client_order_id.clone(),
            order_id: VenueOrderId::generate(),
            kind,
            side: request.side,
            quantity: request.quantity,
            price: request.price,
            stop_price: request.stop_price,
            reserved: notional,
            state: OrderState::Resting,
        };
        self.by_client
            .insert(order.client_order_id.clone(), order.order_id.clone());
        self.orders.insert(order.order_id.clone(), order.clone());
        Ok(order)
    }

    /// Fill a resting order; its reservation is spent.
    pub fn fill(&mut self, order_id: &VenueOrderId) -> Option<PaperOrder> {
        let order = self.orders.get_mut(order_id)?;
        order.state = OrderState::Filled;
        order.reserved = Decimal::ZERO;
        Some(order.clone())
    }

    /// Move a resting order to a new price, re-reserving its notional.
    pub fn amend(&mut self, request: &AmendOrderRequest) -> Result<PaperOrder, BrokerError> {
        let (reserved, quantity) = {
            let order = self
                .orders
                .get(&request.order_id)
                .ok_or_else(|| BrokerError::InvalidOrderId {
                    message: format!("unknown order {}", request.order_id),
                })?;
            order.ensure_resting()?;
            (order.reserved, order.quantity)
        };

        let needed = Decimal::from(quantity) * request.new_price;
        self.available += reserved;
        if let Err(err) = self.reserve(needed) {
            self.available -= reserved;
            return Err(err);
        }

        let order = self
            .orders
            .get_mut(&request.order_id)
            .ok_or_else(|| BrokerError::InvalidOrderId {
                message: format!("unknown order {}", request.order_id),
            })?;
        order.reserved = needed;
        if order.kind.requires_price() {
            order.price = Some(request.new_price);
        } else {
            order.stop_price = Some(request.new_price);
        }
        Ok(order.clone())
    }

    /// Cancel a resting order by client id, releasing its reservation.
    pub fn cancel(&mut self, client_order_id: &ClientOrderId) -> Result<PaperOrder, BrokerError> {
        let order = self
            .by_client
            .get(client_order_id)
            .and_then(|order_id| self.orders.get_mut(order_id))
            .ok_or_else(|| BrokerError::InvalidOrderId {
                message: format!("unknown order {client_order_id}"),
            })?;
        order.ensure_resting()?;

        self.available += order.reserved;
        order.reserved = Decimal::ZERO;
        order.state = OrderState::Canceled;
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Symbol;
    use rust_decimal_macros::dec;

    fn place(book: &mut Book, id: &str, quantity: u64, price: Decimal) -> PaperOrder {
        let request = PlaceOrderRequest::new(
            ClientOrderId::new(id),
            Symbol::new("XBTUSD"),
            OrderSide::Buy,
            quantity,
        )
        .with_price(Some(price));
        book.open(OrderKind::Limit, &request, price).unwrap()
    }

    #[test]
    fn failed_amend_keeps_reservation() {
        let mut book = Book::new(dec!(1000));
        let order = place(&mut book, "cl-1", 5, dec!(100));
        assert_eq!(book.available(), dec!(500));

        let err = book
            .amend(&AmendOrderRequest {
                client_order_id: ClientOrderId::new("cl-a"),
                order_id: order.order_id.clone(),
                symbol: Symbol::new("XBTUSD"),
                side: OrderSide::Buy,
                amended_kind: OrderKind::Limit,
                new_price: dec!(300),
                max_price_delta: dec!(1),
                text: None,
            })
            .unwrap_err();
        assert!(matches!(err, BrokerError::InsufficientBalance { .. }));
        assert_eq!(book.available(), dec!(500));
    }

    #[test]
    fn filled_orders_cannot_be_canceled() {
        let mut book = Book::new(dec!(1000));
        let order = place(&mut book, "cl-1", 1, dec!(100));
        book.fill(&order.order_id);

        let err = book.cancel(&ClientOrderId::new("cl-1")).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Invalid order status: order {} is filled", order.order_id)
        );
        assert_eq!(book.available(), dec!(900));
    }
}
