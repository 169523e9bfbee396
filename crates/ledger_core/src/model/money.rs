//! Fixed-point money helpers.
//!
//! Balances and amounts are `Decimal` in the model and integer minor units
//! (cents) in storage.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Number of fractional digits carried by every money value.
pub const MONEY_SCALE: u32 = 2;

/// Converts a money value to integer minor units.
///
/// Returns `None` when the value has more than [`MONEY_SCALE`] fractional
/// digits or does not fit in `i64` cents.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    let scaled = amount.checked_mul(Decimal::ONE_HUNDRED)?;
    if !scaled.fract().is_zero() {
        return None;
    }
    scaled.to_i64()
}

/// Converts integer minor units back to a money value with scale 2.
pub fn from_minor_units(minor_units: i64) -> Decimal {
    Decimal::new(minor_units, MONEY_SCALE)
}

/// Returns whether `amount` is representable as stored money.
pub fn is_representable(amount: Decimal) -> bool {
    to_minor_units(amount).is_some()
}

#[cfg(test)]
mod tests {
    use super::{from_minor_units, is_representable, to_minor_units};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_two_decimal_values_exactly() {
        assert_eq!(to_minor_units(dec!(500.00)), Some(50_000));
        assert_eq!(to_minor_units(dec!(0.01)), Some(1));
        assert_eq!(to_minor_units(dec!(-12.5)), Some(-1_250));
        assert_eq!(to_minor_units(dec!(7)), Some(700));
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert_eq!(to_minor_units(dec!(0.001)), None);
        assert!(!is_representable(dec!(10.005)));
    }

    #[test]
    fn trailing_zeros_beyond_scale_are_accepted() {
        assert_eq!(to_minor_units(dec!(1.2300)), Some(123));
    }

    #[test]
    fn rejects_values_outside_i64_cents() {
        assert_eq!(to_minor_units(Decimal::MAX), None);
    }

    #[test]
    fn minor_units_render_with_two_places() {
        assert_eq!(from_minor_units(40_000).to_string(), "400.00");
        assert_eq!(from_minor_units(5).to_string(), "0.05");
    }
}
