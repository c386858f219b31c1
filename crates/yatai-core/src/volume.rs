//! # Volume Module
//!
//! Integer millilitre quantities for keg (lot) accounting.
//!
//! The same reasoning that keeps [`crate::money::Money`] in whole yen keeps
//! volume in whole millilitres: the ledger divides consumed volume by lot
//! volume, and integer division with an explicit remainder is exact where
//! floating point drifts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

// =============================================================================
// Volume Type
// =============================================================================

/// A liquid volume in whole millilitres.
///
/// Used for lot (keg) capacity, per-size pour volume, remaining open-lot
/// volume and cumulative consumption.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Volume(i64);

impl Volume {
    /// Creates a volume from whole millilitres.
    #[inline]
    pub const fn from_ml(ml: i64) -> Self {
        Volume(ml)
    }

    /// Returns the volume in millilitres.
    #[inline]
    pub const fn ml(&self) -> i64 {
        self.0
    }

    /// Zero volume.
    #[inline]
    pub const fn zero() -> Self {
        Volume(0)
    }

    /// Checks if the volume is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the volume is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies volume by a quantity (e.g. pour volume × cups sold).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Volume(self.0 * qty)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ml", self.0)
    }
}

impl Add for Volume {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Volume(self.0 + other.0)
    }
}

impl AddAssign for Volume {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Volume {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Volume(self.0 - other.0)
    }
}

impl Mul<i64> for Volume {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Volume(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_display() {
        let v = Volume::from_ml(350);
        assert_eq!(v.ml(), 350);
        assert_eq!(v.to_string(), "350ml");
    }

    #[test]
    fn test_arithmetic() {
        let pour = Volume::from_ml(500);
        assert_eq!((pour * 3).ml(), 1500);
        assert_eq!(pour.multiply_quantity(2).ml(), 1000);
        assert_eq!((pour + Volume::from_ml(250)).ml(), 750);
        assert_eq!((pour - Volume::from_ml(200)).ml(), 300);
    }

    #[test]
    fn test_checks() {
        assert!(Volume::zero().is_zero());
        assert!(Volume::from_ml(1).is_positive());
        assert!(!Volume::from_ml(0).is_positive());
    }
}
