//! Fixed-precision rounding used at the determinism-critical boundaries the
//! spec calls out: C5's classification outputs and C6's band averages and
//! priority scores. Everywhere else in this crate plain `f64` comparisons
//! are used, since no rounding boundary is specified there.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds `value` to `precision` decimal digits using banker's rounding
/// (round-half-to-even), so repeated runs and different platforms agree on
/// the exact bit pattern of the result.
pub fn round_decimal(value: f64, precision: u32) -> f64 {
    match Decimal::from_f64_retain(value) {
        Some(d) => d
            .round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
            .try_into()
            .unwrap_or(value),
        None => value,
    }
}
