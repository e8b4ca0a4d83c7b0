//! Order side.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl OrderSide {
    /// `price` moved `distance` in the direction this side pays more:
    /// up for buys, down for sells.
    #[must_use]
    pub fn beyond(self, price: Decimal, distance: Decimal) -> Decimal {
        match self {
            Self::Buy => price + distance,
            Self::Sell => price - distance,
        }
    }

    /// `price` moved `distance` in the direction this side pays less.
    #[must_use]
    pub fn short_of(self, price: Decimal, distance: Decimal) -> Decimal {
        match self {
            Self::Buy => price - distance,
            Self::Sell => price + distance,
        }
    }

    /// The quote an aggressive order of this side trades against.
    #[must_use]
    pub const fn touch(self, bid: Decimal, ask: Decimal) -> Decimal {
        match self {
            Self::Buy => ask,
            Self::Sell => bid,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn offsets_follow_the_side() {
        assert_eq!(OrderSide::Buy.beyond(dec!(100), dec!(1)), dec!(101));
        assert_eq!(OrderSide::Sell.beyond(dec!(100), dec!(1)), dec!(99));
        assert_eq!(OrderSide::Buy.short_of(dec!(100), dec!(1)), dec!(99));
        assert_eq!(OrderSide::Sell.short_of(dec!(100), dec!(1)), dec!(101));
    }

    #[test]
    fn touch_is_the_far_quote() {
        assert_eq!(OrderSide::Buy.touch(dec!(9), dec!(10)), dec!(10));
        assert_eq!(OrderSide::Sell.touch(dec!(9), dec!(10)), dec!(9));
    }

    #[test]
    fn serializes_in_upper_case() {
        assert_eq!(serde_json::to_string(&OrderSide::Sell).unwrap(), "\"SELL\"");
        let parsed: OrderSide = serde_json::from_str("\"BUY\"").unwrap();
        assert_eq!(parsed, OrderSide::Buy);
    }
}
