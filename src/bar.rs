//! The single input event type every engine in this crate consumes.

use serde::{Deserialize, Serialize};

use crate::error::{StructureError, StructureResult};

/// A single OHLCV bar, already bucketed to its timeframe by an external
/// aggregator. `timestamp` is the bar's UTC open time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Checks the invariants from the data model: all fields finite,
    /// non-negative volume, and `low <= min(open,close) <= max(open,close) <= high`.
    pub fn validate(&self) -> StructureResult<()> {
        for (name, val) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if !val.is_finite() {
                return Err(StructureError::InvalidBar(format!(
                    "{name} is not finite: {val}"
                )));
            }
        }
        if self.volume < 0.0 {
            return Err(StructureError::InvalidBar(format!(
                "volume must be >= 0, got {}",
                self.volume
            )));
        }
        let body_lo = self.open.min(self.close);
        let body_hi = self.open.max(self.close);
        if !(self.low <= body_lo && body_hi <= self.high) {
            return Err(StructureError::InvalidBar(format!(
                "OHLC invariant violated: low={} open={} close={} high={}",
                self.low, self.open, self.close, self.high
            )));
        }
        Ok(())
    }

    /// The price extreme on the given side, used by C4's trigger detection.
    pub fn extreme(&self, bullish_break: bool) -> f64 {
        if bullish_break { self.high } else { self.low }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_bar() -> Bar {
        Bar::new(1_700_000_000_000, 100.0, 105.0, 99.0, 102.0, 10.0)
    }

    #[test]
    fn accepts_well_formed_bar() {
        assert!(valid_bar().validate().is_ok());
    }

    #[test]
    fn rejects_non_finite_fields() {
        let mut bar = valid_bar();
        bar.close = f64::NAN;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn rejects_negative_volume() {
        let mut bar = valid_bar();
        bar.volume = -1.0;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn rejects_high_below_body() {
        let mut bar = valid_bar();
        bar.high = 101.0; // close is 102.0, above high
        assert!(bar.validate().is_err());
    }

    #[test]
    fn rejects_low_above_body() {
        let mut bar = valid_bar();
        bar.low = 100.5; // open is 100.0, below low
        assert!(bar.validate().is_err());
    }

    #[test]
    fn duplicate_bars_are_bitwise_equal() {
        assert_eq!(valid_bar(), valid_bar());
    }
}
