//! Execution instructions attached to an order.

use serde::{Deserialize, Serialize};

/// Trigger-price instructions. They pick the reference price and are only
/// meaningful for triggered orders.
const TRIGGER_PRICE_INSTRUCTIONS: &[&str] = &["LastPrice", "MarkPrice", "IndexPrice"];

/// Which venue price an order refers to when none is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    /// Last traded price.
    Last,
    /// Mark price.
    Mark,
    /// Index price.
    Index,
    /// Midpoint of the best bid and ask.
    Mid,
}

/// Ordered list of venue execution instructions (e.g. `ParticipateDoNotInitiate`,
/// `LastPrice`, `Close`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecInstructions(Vec<String>);

impl ExecInstructions {
    /// Create from any list of instruction strings.
    #[must_use]
    pub fn new<I, S>(instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(instructions.into_iter().map(Into::into).collect())
    }

    /// Check whether an instruction is present.
    #[must_use]
    pub fn contains(&self, instruction: &str) -> bool {
        self.0.iter().any(|i| i == instruction)
    }

    /// True when no instruction is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Instructions as string slices.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The price source selected by the trigger-price instruction, if any.
    /// Defaults to the mid price.
    #[must_use]
    pub fn price_source(&self) -> PriceSource {
        if self.contains("LastPrice") {
            PriceSource::Last
        } else if self.contains("MarkPrice") {
            PriceSource::Mark
        } else if self.contains("IndexPrice") {
            PriceSource::Index
        } else {
            PriceSource::Mid
        }
    }

    /// Copy without trigger-price instructions, for orders the venue does
    /// not trigger.
    #[must_use]
    pub fn without_trigger_prices(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|i| !TRIGGER_PRICE_INSTRUCTIONS.contains(&i.as_str()))
                .cloned()
                .collect(),
        )
    }

    /// Comma-separated form used by venues.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}
