//! Equilibrium classifier (C5): pure price-vs-range classification into
//! PREMIUM/DISCOUNT/EQUILIBRIUM.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::config::EquilibriumConfig;
use crate::math::round_decimal;
use crate::range::SwingRange;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Zone {
    Premium,
    Discount,
    Equilibrium,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumLevel {
    pub range: SwingRange,
    pub current_price: f64,
    pub equilibrium: f64,
    pub zone: Zone,
    pub distance_points: f64,
    pub distance_percent: f64,
}

/// Classifies `price` against `[low, high]`. Returns `None` (⊥) for a
/// degenerate or too-small range rather than raising, per the contract:
/// this is a stream-level judgment call, not a programmer error.
pub fn equilibrium(
    low: f64,
    high: f64,
    price: f64,
    cfg: &EquilibriumConfig,
) -> Option<EquilibriumLevel> {
    if !low.is_finite() || !high.is_finite() || !price.is_finite() {
        return None;
    }
    if high <= low {
        return None;
    }
    let range = high - low;
    if range < cfg.min_range_size {
        return None;
    }

    let eq = (high + low) / 2.0;
    let distance_points = price - eq;
    let distance_percent = distance_points / range;

    let zone = if distance_percent >= cfg.threshold {
        Zone::Premium
    } else if distance_percent <= -cfg.threshold {
        Zone::Discount
    } else {
        Zone::Equilibrium
    };

    let swing_range = SwingRange::new(high, low, 0, None, crate::range::RangeSource::Computed)
        .expect("high > low already checked above");

    Some(EquilibriumLevel {
        range: swing_range,
        current_price: price,
        equilibrium: round_decimal(eq, cfg.precision),
        zone,
        distance_points: round_decimal(distance_points, cfg.precision),
        distance_percent: round_decimal(distance_percent, cfg.precision),
    })
}

/// Convenience wrapper taking an already-constructed `SwingRange`.
pub fn equilibrium_range(
    range: &SwingRange,
    price: f64,
    cfg: &EquilibriumConfig,
) -> Option<EquilibriumLevel> {
    equilibrium(range.low, range.high, price, cfg).map(|mut lvl| {
        lvl.range = *range;
        lvl
    })
}

/// Applies `equilibrium_range` across many ranges at a single price,
/// discarding ⊥ results and preserving input order.
pub fn equilibrium_batch(
    ranges: &[SwingRange],
    price: f64,
    cfg: &EquilibriumConfig,
) -> Vec<EquilibriumLevel> {
    ranges
        .iter()
        .filter_map(|r| equilibrium_range(r, price, cfg))
        .collect()
}
