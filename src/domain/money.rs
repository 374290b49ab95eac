//! Monetary types for price and volume representation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price represented as a Decimal for precision. Always quote per base.
pub type Price = Decimal;

/// Volume represented as a Decimal for precision.
pub type Volume = Decimal;

/// Inclusive range of allowed values. `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl Range {
    /// A range that admits every value.
    pub const UNBOUNDED: Self = Self {
        min: None,
        max: None,
    };

    #[must_use]
    pub const fn new(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn between(min: Decimal, max: Decimal) -> Self {
        Self::new(Some(min), Some(max))
    }

    #[must_use]
    pub const fn at_least(min: Decimal) -> Self {
        Self::new(Some(min), None)
    }

    #[must_use]
    pub fn contains(&self, value: Decimal) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn range_bounds_are_inclusive() {
        let range = Range::between(dec!(1), dec!(10));
        assert!(range.contains(dec!(1)));
        assert!(range.contains(dec!(10)));
        assert!(!range.contains(dec!(0.99)));
        assert!(!range.contains(dec!(10.01)));
    }

    #[test]
    fn unbounded_range_accepts_anything() {
        assert!(Range::UNBOUNDED.contains(dec!(-5)));
        assert!(Range::at_least(dec!(0.1)).contains(dec!(1000000)));
    }
}
