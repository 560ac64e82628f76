//! # Money Module
//!
//! Provides the `Money` type for prices and costs.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices and unit costs are stored as integer minor units (cents/yen).  │
//! │                                                                         │
//! │  Averages are the one place fractions appear:                           │
//! │    3 units @ 100 + 1 unit @ 101  →  W.A.C. = 100.25 per unit           │
//! │                                                                         │
//! │  Those live in `rust_decimal::Decimal` and are rounded back into        │
//! │  Money exactly once, with round-half-to-even, when a report needs a     │
//! │  monetary total.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salon_core::money::Money;
//!
//! let unit = Money::from_cents(1200);
//! let total = unit.checked_multiply_quantity(3);
//! assert_eq!(total, Some(Money::from_cents(3600)));
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that period totals (e.g. a negative COGS after heavy
/// write-ups) can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_multiply_quantity(3).map(|m| m.cents()), Some(897));
    /// assert!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3).is_none());
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Exact decimal view of the value (in minor units).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Rounds a decimal amount of minor units into Money.
    ///
    /// Uses round-half-to-even so repeated period reports carry no bias.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use salon_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal_rounded(Decimal::new(1005, 1)).cents(), 100);
    /// assert_eq!(Money::from_decimal_rounded(Decimal::new(1015, 1)).cents(), 102);
    /// ```
    pub fn from_decimal_rounded(amount: Decimal) -> Self {
        let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        // Saturate instead of wrapping: no salon holds 9e18 of anything.
        Money(rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the raw minor units with two decimals (debugging only).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);
        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_line_total_overflow_is_none() {
        let unit = Money::from_cents(1250);
        assert_eq!(unit.checked_multiply_quantity(4), Some(Money::from_cents(5000)));
        assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(Money::from_decimal_rounded(Decimal::new(25, 1)).cents(), 2);
        assert_eq!(Money::from_decimal_rounded(Decimal::new(35, 1)).cents(), 4);
        assert_eq!(Money::from_decimal_rounded(Decimal::new(-25, 1)).cents(), -2);
        assert_eq!(Money::from_decimal_rounded(Decimal::new(1001, 1)).cents(), 100);
    }

    #[test]
    fn test_decimal_view_is_exact() {
        assert_eq!(Money::from_cents(12345).to_decimal(), Decimal::new(12345, 0));
    }
}
