//! Default trigger price derivation.
//!
//! | Kind | Buy | Sell |
//! |------|-----|------|
//! | `Stop` | price + δ | price − δ |
//! | `MarketIfTouched` | price − δ | price + δ |
//! | `StopLimit` | price − δ | price + δ |
//! | `LimitIfTouched` | price + δ | price − δ |
//!
//! Stop and market-if-touched orders use the price as the current market
//! reference. Stop-limit and limit-if-touched orders use it as their limit,
//! and the trigger sits one offset before the limit is reached.

use rust_decimal::Decimal;

use super::{OrderKind, OrderSide};

/// Derive a trigger price for `kind` from `price` and the absolute offset.
///
/// Returns `None` for kinds without a trigger.
#[must_use]
pub fn default_stop_price(
    kind: OrderKind,
    side: OrderSide,
    price: Decimal,
    offset: Decimal,
) -> Option<Decimal> {
    let offset = offset.abs();
    match kind {
        OrderKind::Stop | OrderKind::LimitIfTouched => Some(side.beyond(price, offset)),
        OrderKind::MarketIfTouched | OrderKind::StopLimit => Some(side.short_of(price, offset)),
        OrderKind::Market | OrderKind::Limit | OrderKind::Amend | OrderKind::Cancel => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(OrderKind::Stop, OrderSide::Buy, dec!(102); "stop buy above")]
    #[test_case(OrderKind::Stop, OrderSide::Sell, dec!(98); "stop sell below")]
    #[test_case(OrderKind::MarketIfTouched, OrderSide::Buy, dec!(98); "mit buy below")]
    #[test_case(OrderKind::MarketIfTouched, OrderSide::Sell, dec!(102); "mit sell above")]
    #[test_case(OrderKind::StopLimit, OrderSide::Buy, dec!(98); "stop limit buy before limit")]
    #[test_case(OrderKind::StopLimit, OrderSide::Sell, dec!(102); "stop limit sell before limit")]
    #[test_case(OrderKind::LimitIfTouched, OrderSide::Buy, dec!(102); "lit buy above limit")]
    #[test_case(OrderKind::LimitIfTouched, OrderSide::Sell, dec!(98); "lit sell below limit")]
    fn derives_trigger(kind: OrderKind, side: OrderSide, expected: Decimal) {
        assert_eq!(
            default_stop_price(kind, side, dec!(100), dec!(2)),
            Some(expected)
        );
    }

    #[test]
    fn negative_offsets_are_treated_as_distances() {
        assert_eq!(
            default_stop_price(OrderKind::Stop, OrderSide::Buy, dec!(100), dec!(-0.5)),
            Some(dec!(100.5))
        );
    }

    #[test]
    fn untriggered_kinds_have_no_stop() {
        assert!(default_stop_price(OrderKind::Limit, OrderSide::Buy, dec!(1), dec!(1)).is_none());
        assert!(default_stop_price(OrderKind::Cancel, OrderSide::Buy, dec!(1), dec!(1)).is_none());
    }
}
