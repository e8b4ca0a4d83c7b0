//! Quantity reduction applied when the venue reports insufficient balance.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Reduce-and-resubmit policy for insufficient balance failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityReduction {
    /// Multiplier applied to the quantity on each failure (default: 0.8).
    pub factor: Decimal,
    /// Smallest quantity worth resubmitting (default: 31).
    pub min_quantity: u64,
}

impl Default for QuantityReduction {
    fn default() -> Self {
        Self {
            factor: dec!(0.8),
            min_quantity: 31,
        }
    }
}

/// What to do after an insufficient balance failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionStep {
    /// Resubmit with this quantity.
    Resubmit(u64),
    /// The reduced quantity fell below the floor or did not shrink.
    GiveUp {
        /// The quantity that was rejected.
        reduced: u64,
    },
}

impl QuantityReduction {
    /// Create a policy.
    #[must_use]
    pub const fn new(factor: Decimal, min_quantity: u64) -> Self {
        Self {
            factor,
            min_quantity,
        }
    }

    /// `round(factor × quantity)`, rounding half to even.
    #[must_use]
    pub fn reduce(&self, quantity: u64) -> u64 {
        (Decimal::from(quantity) * self.factor)
            .round()
            .to_u64()
            .unwrap_or(0)
    }

    /// Next step for a request that failed with `quantity`.
    ///
    /// A resubmission is always strictly smaller than `quantity`, so repeated
    /// failures end in [`ReductionStep::GiveUp`] for any factor and floor.
    #[must_use]
    pub fn next_step(&self, quantity: u64) -> ReductionStep {
        let reduced = self.reduce(quantity);
        if reduced >= quantity || reduced < self.min_quantity {
            ReductionStep::GiveUp { reduced }
        } else {
            ReductionStep::Resubmit(reduced)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_sequence_from_one_hundred() {
        let policy = QuantityReduction::default();
        let mut quantity = 100;
        let mut attempted = vec![quantity];

        loop {
            match policy.next_step(quantity) {
                ReductionStep::Resubmit(next) => {
                    attempted.push(next);
                    quantity = next;
                }
                ReductionStep::GiveUp { reduced } => {
                    attempted.push(reduced);
                    break;
                }
            }
        }

        assert_eq!(attempted, vec![100, 80, 64, 51, 41, 33, 26]);
    }

    #[test]
    fn floor_is_inclusive() {
        let policy = QuantityReduction::new(dec!(0.5), 31);
        assert_eq!(policy.next_step(62), ReductionStep::Resubmit(31));
        assert_eq!(policy.next_step(60), ReductionStep::GiveUp { reduced: 30 });
    }

    #[test]
    fn rounding_back_to_the_same_quantity_gives_up() {
        let low_floor = QuantityReduction::new(dec!(0.8), 1);
        assert_eq!(low_floor.next_step(3), ReductionStep::Resubmit(2));
        assert_eq!(low_floor.next_step(2), ReductionStep::GiveUp { reduced: 2 });

        let gentle = QuantityReduction::new(dec!(0.99), 31);
        assert_eq!(gentle.next_step(50), ReductionStep::GiveUp { reduced: 50 });
    }

    proptest! {
        #[test]
        fn reduction_strictly_decreases(quantity in 1u64..1_000_000) {
            let policy = QuantityReduction::default();
            let reduced = policy.reduce(quantity);
            prop_assert!(reduced <= quantity);
            if quantity >= 3 {
                prop_assert!(reduced < quantity);
            }
        }

        #[test]
        fn resubmissions_always_terminate(quantity in 1u64..10_000_000) {
            let policy = QuantityReduction::default();
            let mut current = quantity;
            let mut steps = 0;
            while let ReductionStep::Resubmit(next) = policy.next_step(current) {
                prop_assert!(next >= policy.min_quantity);
                current = next;
                steps += 1;
                prop_assert!(steps < 100);
            }
        }

        #[test]
        fn any_factor_and_floor_terminate(
            quantity in 1u64..100_000,
            percent in 1i64..100,
            min_quantity in 1u64..100,
        ) {
            let policy = QuantityReduction::new(Decimal::new(percent, 2), min_quantity);
            let mut current = quantity;
            let mut steps = 0u64;
            while let ReductionStep::Resubmit(next) = policy.next_step(current) {
                prop_assert!(next < current);
                prop_assert!(next >= min_quantity);
                current = next;
                steps += 1;
                prop_assert!(steps <= quantity);
            }
        }
    }
}
