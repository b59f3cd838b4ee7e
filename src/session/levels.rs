//! Maintains per-session high/low extremes (and the instant each was first
//! reached) from a live bar stream.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bar::Bar;
use crate::config::{SessionName, SessionsConfig};
use crate::error::{StructureError, StructureResult};

use super::boundary::{self, SessionBoundary};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionLevels {
    pub session: SessionName,
    pub high: f64,
    pub low: f64,
    pub high_time: i64,
    pub low_time: i64,
}

impl SessionLevels {
    fn unset(session: SessionName) -> Self {
        Self {
            session,
            high: f64::NAN,
            low: f64::NAN,
            high_time: 0,
            low_time: 0,
        }
    }

    /// Updates the extreme for one side. On a strictly better extreme, the
    /// value and its timestamp both advance; on an exact tie, the earlier
    /// timestamp is kept.
    fn observe_high(&mut self, price: f64, timestamp: i64) {
        if self.high.is_nan() || price > self.high {
            self.high = price;
            self.high_time = timestamp;
        }
    }

    fn observe_low(&mut self, price: f64, timestamp: i64) {
        if self.low.is_nan() || price < self.low {
            self.low = price;
            self.low_time = timestamp;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLevelsSnapshot {
    pub symbol: String,
    pub boundaries: Vec<SessionBoundary>,
    pub levels: Vec<SessionLevels>,
}

/// Drives session level tracking for one symbol across one local trading
/// date at a time: `start_date → many on_bar → end_date`.
#[derive(Debug, Clone)]
pub struct SessionLevelsEngine {
    symbol: String,
    cfg: SessionsConfig,
    boundaries: Vec<SessionBoundary>,
    levels: Vec<SessionLevels>,
    last_accepted: Option<Bar>,
    date_started: bool,
}

impl SessionLevelsEngine {
    pub fn new(symbol: impl Into<String>, cfg: SessionsConfig) -> StructureResult<Self> {
        cfg.validate()?;
        Ok(Self {
            symbol: symbol.into(),
            cfg,
            boundaries: Vec::new(),
            levels: Vec::new(),
            last_accepted: None,
            date_started: false,
        })
    }

    pub fn start_date(&mut self, date_local: &str) -> StructureResult<()> {
        let boundaries = boundary::materialize(date_local, &self.cfg)?;
        self.levels = boundaries
            .iter()
            .map(|b| SessionLevels::unset(b.name))
            .collect();
        self.boundaries = boundaries;
        self.last_accepted = None;
        self.date_started = true;
        Ok(())
    }

    pub fn on_bar(&mut self, bar: &Bar) -> StructureResult<()> {
        if !self.date_started {
            return Err(StructureError::NoDateStarted);
        }
        bar.validate()?;

        if let Some(last) = &self.last_accepted {
            if bar.timestamp == last.timestamp {
                if bar == last {
                    return Ok(());
                }
                return Err(StructureError::OutOfOrderBar {
                    received: bar.timestamp,
                    last_accepted: last.timestamp,
                });
            }
            if bar.timestamp < last.timestamp {
                return Err(StructureError::OutOfOrderBar {
                    received: bar.timestamp,
                    last_accepted: last.timestamp,
                });
            }
        }

        let idx = self
            .boundaries
            .iter()
            .position(|b| b.start <= bar.timestamp && bar.timestamp < b.end);

        match idx {
            Some(i) => {
                let levels = &mut self.levels[i];
                levels.observe_high(bar.high, bar.timestamp);
                levels.observe_low(bar.low, bar.timestamp);
            }
            None => {
                trace!(
                    symbol = %self.symbol,
                    timestamp = bar.timestamp,
                    "bar falls outside every session window, ignoring"
                );
            }
        }

        self.last_accepted = Some(*bar);
        Ok(())
    }

    pub fn snapshot(&self) -> StructureResult<SessionLevelsSnapshot> {
        if !self.date_started {
            return Err(StructureError::NoDateStarted);
        }
        Ok(SessionLevelsSnapshot {
            symbol: self.symbol.clone(),
            boundaries: self.boundaries.clone(),
            levels: self.levels.clone(),
        })
    }

    pub fn end_date(&mut self) -> StructureResult<SessionLevelsSnapshot> {
        let snap = self.snapshot()?;
        self.boundaries.clear();
        self.levels.clear();
        self.last_accepted = None;
        self.date_started = false;
        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, high: f64, low: f64) -> Bar {
        Bar::new(ts, (high + low) / 2.0, high, low, (high + low) / 2.0, 1.0)
    }

    #[test]
    fn errors_before_start_date() {
        let mut engine =
            SessionLevelsEngine::new("ES", SessionsConfig::es_nq_chicago_default()).unwrap();
        assert!(matches!(
            engine.on_bar(&bar(0, 1.0, 0.0)),
            Err(StructureError::NoDateStarted)
        ));
    }

    #[test]
    fn midnight_asia_attribution() {
        let mut engine =
            SessionLevelsEngine::new("ES", SessionsConfig::es_nq_chicago_default()).unwrap();
        engine.start_date("2024-01-15").unwrap();

        // 19:00 Chicago on 2024-01-15 -> 2024-01-16T01:00:00Z, inside ASIA.
        engine.on_bar(&bar(1_705_366_800_000, 4510.0, 4495.0)).unwrap();
        // 19:00 Chicago on 2024-01-14 -> 2024-01-15T01:00:00Z, before this date's ASIA window.
        // (ignored: falls before start_date's materialized boundaries)

        let snap = engine.snapshot().unwrap();
        let asia = snap
            .levels
            .iter()
            .find(|l| l.session == SessionName::Asia)
            .unwrap();
        assert_eq!(asia.high, 4510.0);
        assert_eq!(asia.low, 4495.0);
    }

    #[test]
    fn tie_break_keeps_earlier_time() {
        let mut engine =
            SessionLevelsEngine::new("ES", SessionsConfig::es_nq_chicago_default()).unwrap();
        engine.start_date("2024-01-15").unwrap();
        let ny_start = engine
            .boundaries
            .iter()
            .find(|b| b.name == SessionName::Ny)
            .unwrap()
            .start;

        engine.on_bar(&bar(ny_start, 4500.0, 4490.0)).unwrap();
        engine
            .on_bar(&bar(ny_start + 60_000, 4500.0, 4490.0))
            .unwrap();

        let snap = engine.snapshot().unwrap();
        let ny = snap
            .levels
            .iter()
            .find(|l| l.session == SessionName::Ny)
            .unwrap();
        assert_eq!(ny.high_time, ny_start);
        assert_eq!(ny.low_time, ny_start);
    }

    #[test]
    fn out_of_order_bar_errors_but_exact_duplicate_is_idempotent() {
        let mut engine =
            SessionLevelsEngine::new("ES", SessionsConfig::es_nq_chicago_default()).unwrap();
        engine.start_date("2024-01-15").unwrap();
        let ny_start = engine
            .boundaries
            .iter()
            .find(|b| b.name == SessionName::Ny)
            .unwrap()
            .start;

        let b = bar(ny_start, 4500.0, 4490.0);
        engine.on_bar(&b).unwrap();
        assert!(engine.on_bar(&b).is_ok());

        let earlier = bar(ny_start - 1000, 4500.0, 4490.0);
        assert!(matches!(
            engine.on_bar(&earlier),
            Err(StructureError::OutOfOrderBar { .. })
        ));
    }

    #[test]
    fn end_date_clears_state() {
        let mut engine =
            SessionLevelsEngine::new("ES", SessionsConfig::es_nq_chicago_default()).unwrap();
        engine.start_date("2024-01-15").unwrap();
        engine.end_date().unwrap();
        assert!(matches!(
            engine.snapshot(),
            Err(StructureError::NoDateStarted)
        ));
    }
}
