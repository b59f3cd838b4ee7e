//! `SwingRange`: the high/low pair equilibrium classification and confluence
//! banding both measure against.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{StructureError, StructureResult};
use crate::timeframe::Htf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum RangeSource {
    Computed,
    Provided,
}

/// A high/low range anchored to a point in time, optionally tied to an HTF.
/// `timeframe` is `None` for ranges that are not HTF-specific (e.g. an
/// ad-hoc session range passed straight to the equilibrium classifier).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingRange {
    pub high: f64,
    pub low: f64,
    pub timestamp: i64,
    pub timeframe: Option<Htf>,
    pub source: RangeSource,
}

impl SwingRange {
    /// Validating constructor: rejects `low >= high`. Use the plain struct
    /// literal instead when a caller (e.g. the equilibrium classifier) needs
    /// to accept an invalid range and respond with "no classification"
    /// rather than an error.
    pub fn new(
        high: f64,
        low: f64,
        timestamp: i64,
        timeframe: Option<Htf>,
        source: RangeSource,
    ) -> StructureResult<Self> {
        if !(low < high) {
            return Err(StructureError::InvalidRange(format!(
                "low ({low}) must be < high ({high})"
            )));
        }
        Ok(Self {
            high,
            low,
            timestamp,
            timeframe,
            source,
        })
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        assert!(SwingRange::new(100.0, 100.0, 0, None, RangeSource::Computed).is_err());
        assert!(SwingRange::new(90.0, 100.0, 0, None, RangeSource::Computed).is_err());
    }

    #[test]
    fn accepts_valid_range() {
        let r = SwingRange::new(110.0, 100.0, 0, None, RangeSource::Computed).unwrap();
        assert_eq!(r.width(), 10.0);
        assert_eq!(r.midpoint(), 105.0);
    }
}
