//! Adapter layer: converts between the solver's f64 world and the ledger's
//! Decimal types.

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::ledger::Cash;

/// Convert f64 to Decimal (lossy but sufficient for plan coefficients).
pub fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

/// Convert Decimal to f64.
pub fn from_decimal(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Ledger amount as an LP coefficient.
pub fn cash_to_f64(c: Cash) -> f64 {
    from_decimal(c.0)
}

/// LP-side amount (e.g. a configured fee) as a ledger amount.
pub fn cash_from_f64(v: f64) -> Cash {
    Cash(to_decimal(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_roundtrip() {
        let original = 42.5_f64;
        let dec = to_decimal(original);
        let back = from_decimal(dec);
        assert!((original - back).abs() < 1e-10);
    }

    #[test]
    fn nan_maps_to_zero() {
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn cash_coefficients() {
        assert_eq!(cash_to_f64(Cash(dec!(-150))), -150.0);
        assert_eq!(cash_from_f64(50.0), Cash(dec!(50)));
    }
}
