//! Paper venue configuration: balance and per-symbol market data.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Paper venue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Account balance, in quote currency, available for new orders.
    #[serde(default = "default_balance")]
    pub balance: Decimal,
    /// Fill limit orders immediately at their price.
    #[serde(default = "default_fill_limit_orders")]
    pub fill_limit_orders: bool,
    /// Market data per symbol.
    #[serde(default = "default_symbols")]
    pub symbols: BTreeMap<String, PaperSymbolConfig>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            balance: default_balance(),
            fill_limit_orders: default_fill_limit_orders(),
            symbols: default_symbols(),
        }
    }
}

/// Market data for one paper symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSymbolConfig {
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Last traded price; mid when unset.
    #[serde(default)]
    pub last: Option<Decimal>,
    /// Mark price; mid when unset.
    #[serde(default)]
    pub mark: Option<Decimal>,
    /// Index price; mid when unset.
    #[serde(default)]
    pub index: Option<Decimal>,
    /// Default distance between a price and its trigger.
    pub stop_offset: Decimal,
}

impl PaperSymbolConfig {
    /// Midpoint of bid and ask.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / dec!(2)
    }
}

fn default_balance() -> Decimal {
    dec!(1000000)
}

const fn default_fill_limit_orders() -> bool {
    true
}

fn default_symbols() -> BTreeMap<String, PaperSymbolConfig> {
    BTreeMap::from([(
        "XBTUSD".to_string(),
        PaperSymbolConfig {
            bid: dec!(9499.5),
            ask: dec!(9500.5),
            last: None,
            mark: None,
            index: None,
            stop_offset: dec!(0.5),
        },
    )])
}
