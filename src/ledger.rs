// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Cash ledger denomination.
//!
//! Every federate balance, cost, schedule value and fee is a [`Cash`] amount
//! backed by `rust_decimal::Decimal`, so settlement arithmetic is exact. The
//! LP boundary converts to `f64` through [`crate::adapter`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Currency amount; negative values are debts or penalties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cash(pub Decimal);

impl Cash {
    /// Zero value
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Create from a `Decimal` value
    pub fn from_decimal(d: Decimal) -> Self {
        Self(d)
    }

    /// Create from a whole number of units
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Whether the value is exactly zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the value is strictly below zero
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Scale by a decimal factor (commission and decommission fractions)
    pub fn scale(self, factor: Decimal) -> Self {
        Self(self.0 * factor)
    }
}

impl Add for Cash {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Cash {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Cash {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Cash {
    type Output = Self;
    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl AddAssign for Cash {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cash {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Cash {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Cash::zero(), Add::add)
    }
}

impl fmt::Display for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn arithmetic_is_exact() {
        let a = Cash(dec!(1200));
        let b = Cash(dec!(499.5));
        assert_eq!(a - b, Cash(dec!(700.5)));
        assert_eq!((a - b) + b, a);
        assert_eq!(Cash(dec!(300)).scale(dec!(0.5)), Cash(dec!(150)));
    }

    #[test]
    fn negativity() {
        assert!(Cash(dec!(-0.01)).is_negative());
        assert!(!Cash::zero().is_negative());
        assert!(!Cash(dec!(5)).is_negative());
    }

    #[test]
    fn sums_and_displays() {
        let total: Cash = [Cash::from_units(50), Cash::from_units(-150)].into_iter().sum();
        assert_eq!(total, Cash::from_units(-100));
        assert_eq!(format!("{}", Cash(dec!(150.00))), "150");
    }
}
