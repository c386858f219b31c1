//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Yen                                              │
//! │    JPY has no minor unit, so one i64 yen IS the smallest unit.         │
//! │    Totals, tendered amounts, change and the register balance are        │
//! │    exact by construction.                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use yatai_core::money::Money;
//!
//! let medium_pour = Money::from_yen(850);
//! let total = medium_pour * 2;
//! assert_eq!(total.yen(), 1700);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in whole yen.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for shortfalls and refunds
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole yen.
    ///
    /// ## Example
    /// ```rust
    /// use yatai_core::money::Money;
    ///
    /// let price = Money::from_yen(700);
    /// assert_eq!(price.yen(), 700);
    /// ```
    #[inline]
    pub const fn from_yen(yen: i64) -> Self {
        Money(yen)
    }

    /// Returns the value in yen.
    #[inline]
    pub const fn yen(&self) -> i64 {
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use yatai_core::money::Money;
    ///
    /// let unit_price = Money::from_yen(850);
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.yen(), 2550);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Saturating subtraction, clamped at zero.
    ///
    /// Used for running balances that must never display below zero.
    #[inline]
    pub const fn saturating_sub_floor_zero(&self, other: Self) -> Self {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// This is for logs and debugging. The terminal UI formats amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}¥{}", sign, self.0.abs())
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yen() {
        let money = Money::from_yen(1500);
        assert_eq!(money.yen(), 1500);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_yen(1500)), "¥1500");
        assert_eq!(format!("{}", Money::from_yen(0)), "¥0");
        assert_eq!(format!("{}", Money::from_yen(-550)), "-¥550");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_yen(1000);
        let b = Money::from_yen(500);

        assert_eq!((a + b).yen(), 1500);
        assert_eq!((a - b).yen(), 500);
        assert_eq!((a * 3).yen(), 3000);

        let mut acc = Money::zero();
        acc += a;
        acc -= b;
        assert_eq!(acc.yen(), 500);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_yen(700);
        assert_eq!(unit_price.multiply_quantity(4).yen(), 2800);
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(!Money::from_yen(100).is_negative());
        assert!(Money::from_yen(-100).is_negative());
        assert_eq!(Money::from_yen(-100).abs().yen(), 100);
    }

    #[test]
    fn test_saturating_sub_floor_zero() {
        let a = Money::from_yen(300);
        let b = Money::from_yen(500);
        assert_eq!(a.saturating_sub_floor_zero(b), Money::zero());
        assert_eq!(b.saturating_sub_floor_zero(a).yen(), 200);
    }
}
