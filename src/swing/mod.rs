//! HTF swing detection (C3): confirmed swing highs/lows on H1 and H4 under
//! a lookback/confirm rule, guaranteed never to repaint once confirmed.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::bar::Bar;
use crate::config::{HtfSwingConfig, SwingConfig};
use crate::error::{StructureError, StructureResult};
use crate::timeframe::Htf;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed swing point. Immutable once produced by the engine: no
/// method on this type or the engine ever mutates a `SwingPoint` after it
/// has been handed to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub htf: Htf,
    pub kind: SwingKind,
    pub price: f64,
    pub timestamp: i64,
    pub bar_index: u64,
    pub strength: f64,
}

/// A not-yet-confirmed candidate, exposed read-only in snapshots so callers
/// can observe in-flight structure without being able to mistake it for a
/// confirmed, non-repaintable `SwingPoint`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingSwing {
    pub price: f64,
    pub timestamp: i64,
    pub bar_index: u64,
    pub confirm_elapsed: usize,
    pub confirm_required: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SwingMetrics {
    pub bars_processed: u64,
    pub candidates_detected: u64,
    pub candidates_replaced: u64,
    pub candidates_invalidated: u64,
    pub confirmed_count: u64,
    pub evicted_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtfSnapshot {
    pub swing_highs: Vec<SwingPoint>,
    pub swing_lows: Vec<SwingPoint>,
    pub pending_high: Option<PendingSwing>,
    pub pending_low: Option<PendingSwing>,
    pub metrics: SwingMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtfSwingsSnapshot {
    pub symbol: String,
    pub h1: HtfSnapshot,
    pub h4: HtfSnapshot,
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// `strength` as a pure, deterministic function of configured lookback and
/// how many confirm bars actually elapsed. See `SPEC_FULL.md` §11 decision 1.
fn pivot_strength(confirm_elapsed: usize, confirm_required: usize, lookback: usize) -> f64 {
    let confirm_ratio = confirm_elapsed as f64 / (confirm_required.max(1) as f64);
    let lookback_depth_score = lookback as f64 / (lookback as f64 + 1.0);
    clamp01(0.5 * confirm_ratio + 0.5 * clamp01(lookback_depth_score))
}

#[derive(Debug, Clone)]
struct HtfState {
    htf: Htf,
    cfg: HtfSwingConfig,
    buffer: VecDeque<(Bar, u64)>,
    bar_counter: u64,
    pending_high: Option<PendingSwing>,
    pending_low: Option<PendingSwing>,
    confirmed_highs: VecDeque<SwingPoint>,
    confirmed_lows: VecDeque<SwingPoint>,
    metrics: SwingMetrics,
}

impl HtfState {
    fn new(htf: Htf, cfg: HtfSwingConfig) -> Self {
        let window = 2 * cfg.lookback + 1;
        Self {
            htf,
            cfg,
            buffer: VecDeque::with_capacity(window),
            bar_counter: 0,
            pending_high: None,
            pending_low: None,
            confirmed_highs: VecDeque::new(),
            confirmed_lows: VecDeque::new(),
            metrics: SwingMetrics::default(),
        }
    }

    fn on_bar(&mut self, bar: &Bar) {
        self.metrics.bars_processed += 1;

        // Step 1: advance any pending candidates using the newly arrived bar.
        if let Some(pending) = self.pending_high {
            if bar.high > pending.price {
                self.pending_high = None;
                self.metrics.candidates_invalidated += 1;
            } else {
                let elapsed = pending.confirm_elapsed + 1;
                if elapsed >= self.cfg.confirm {
                    self.confirm_high(pending, elapsed);
                } else {
                    self.pending_high = Some(PendingSwing {
                        confirm_elapsed: elapsed,
                        ..pending
                    });
                }
            }
        }
        if let Some(pending) = self.pending_low {
            if bar.low < pending.price {
                self.pending_low = None;
                self.metrics.candidates_invalidated += 1;
            } else {
                let elapsed = pending.confirm_elapsed + 1;
                if elapsed >= self.cfg.confirm {
                    self.confirm_low(pending, elapsed);
                } else {
                    self.pending_low = Some(PendingSwing {
                        confirm_elapsed: elapsed,
                        ..pending
                    });
                }
            }
        }

        // Step 2: slide the detection window. A candidate is evaluated the
        // moment it has exactly `lookback` bars after it; bars before it
        // contribute up to `lookback` of left-side context, possibly fewer
        // at the very start of a stream (vacuously satisfied).
        let bar_index = self.bar_counter;
        self.bar_counter += 1;
        let l = self.cfg.lookback;
        let cap = 2 * l + 1;
        self.buffer.push_back((*bar, bar_index));
        if self.buffer.len() > cap {
            self.buffer.pop_front();
        }

        if self.buffer.len() >= l + 1 {
            let center_pos = self.buffer.len() - 1 - l;
            let (center_bar, center_index) = self.buffer[center_pos];

            let is_high = self
                .buffer
                .iter()
                .take(center_pos)
                .all(|(b, _)| center_bar.high > b.high)
                && self
                    .buffer
                    .iter()
                    .skip(center_pos + 1)
                    .all(|(b, _)| center_bar.high >= b.high);
            let is_low = self
                .buffer
                .iter()
                .take(center_pos)
                .all(|(b, _)| center_bar.low < b.low)
                && self
                    .buffer
                    .iter()
                    .skip(center_pos + 1)
                    .all(|(b, _)| center_bar.low <= b.low);

            if is_high {
                self.metrics.candidates_detected += 1;
                let pending = PendingSwing {
                    price: center_bar.high,
                    timestamp: center_bar.timestamp,
                    bar_index: center_index,
                    confirm_elapsed: 0,
                    confirm_required: self.cfg.confirm,
                };
                if self.pending_high.is_some() {
                    self.metrics.candidates_replaced += 1;
                    debug!(htf = %self.htf, "replacing pending swing high before confirmation");
                }
                if self.cfg.confirm == 0 {
                    self.confirm_high(pending, 0);
                } else {
                    self.pending_high = Some(pending);
                }
            }
            if is_low {
                self.metrics.candidates_detected += 1;
                let pending = PendingSwing {
                    price: center_bar.low,
                    timestamp: center_bar.timestamp,
                    bar_index: center_index,
                    confirm_elapsed: 0,
                    confirm_required: self.cfg.confirm,
                };
                if self.pending_low.is_some() {
                    self.metrics.candidates_replaced += 1;
                    debug!(htf = %self.htf, "replacing pending swing low before confirmation");
                }
                if self.cfg.confirm == 0 {
                    self.confirm_low(pending, 0);
                } else {
                    self.pending_low = Some(pending);
                }
            }
        }
    }

    fn confirm_high(&mut self, pending: PendingSwing, elapsed: usize) {
        let strength = pivot_strength(elapsed, self.cfg.confirm, self.cfg.lookback);
        let point = SwingPoint {
            htf: self.htf,
            kind: SwingKind::High,
            price: pending.price,
            timestamp: pending.timestamp,
            bar_index: pending.bar_index,
            strength,
        };
        debug!(htf = %self.htf, price = point.price, "confirmed swing high");
        self.push_confirmed_high(point);
        self.pending_high = None;
        self.metrics.confirmed_count += 1;
    }

    fn confirm_low(&mut self, pending: PendingSwing, elapsed: usize) {
        let strength = pivot_strength(elapsed, self.cfg.confirm, self.cfg.lookback);
        let point = SwingPoint {
            htf: self.htf,
            kind: SwingKind::Low,
            price: pending.price,
            timestamp: pending.timestamp,
            bar_index: pending.bar_index,
            strength,
        };
        debug!(htf = %self.htf, price = point.price, "confirmed swing low");
        self.push_confirmed_low(point);
        self.pending_low = None;
        self.metrics.confirmed_count += 1;
    }

    fn push_confirmed_high(&mut self, point: SwingPoint) {
        self.confirmed_highs.push_back(point);
        if self.confirmed_highs.len() > self.cfg.keep_recent {
            self.confirmed_highs.pop_front();
            self.metrics.evicted_count += 1;
        }
    }

    fn push_confirmed_low(&mut self, point: SwingPoint) {
        self.confirmed_lows.push_back(point);
        if self.confirmed_lows.len() > self.cfg.keep_recent {
            self.confirmed_lows.pop_front();
            self.metrics.evicted_count += 1;
        }
    }

    fn snapshot(&self) -> HtfSnapshot {
        HtfSnapshot {
            swing_highs: self.confirmed_highs.iter().copied().collect(),
            swing_lows: self.confirmed_lows.iter().copied().collect(),
            pending_high: self.pending_high,
            pending_low: self.pending_low,
            metrics: self.metrics,
        }
    }

    fn reset_for_new_date(&mut self) {
        self.buffer.clear();
        self.bar_counter = 0;
        self.pending_high = None;
        self.pending_low = None;
    }
}

/// Drives H1 and H4 swing detection for one symbol.
///
/// `start_date`/`end_date` gate the same way every other engine in this
/// crate does, but confirmed swing history (and its `keepRecent` window)
/// intentionally survives across trading dates: HTF structure is a
/// multi-day concept, unlike a session's intraday high/low.
#[derive(Debug, Clone)]
pub struct HtfSwingsEngine {
    symbol: String,
    h1: HtfState,
    h4: HtfState,
    date_started: bool,
}

impl HtfSwingsEngine {
    pub fn new(symbol: impl Into<String>, cfg: SwingConfig) -> StructureResult<Self> {
        cfg.validate()?;
        Ok(Self {
            symbol: symbol.into(),
            h1: HtfState::new(Htf::H1, cfg.h1),
            h4: HtfState::new(Htf::H4, cfg.h4),
            date_started: false,
        })
    }

    pub fn start_date(&mut self, date_local: &str) -> StructureResult<()> {
        crate::session::boundary::parse_local_date(date_local)?;
        self.h1.reset_for_new_date();
        self.h4.reset_for_new_date();
        self.date_started = true;
        Ok(())
    }

    fn state_mut(&mut self, htf: Htf) -> &mut HtfState {
        match htf {
            Htf::H1 => &mut self.h1,
            Htf::H4 => &mut self.h4,
        }
    }

    fn state(&self, htf: Htf) -> &HtfState {
        match htf {
            Htf::H1 => &self.h1,
            Htf::H4 => &self.h4,
        }
    }

    pub fn on_bar(&mut self, htf: Htf, bar: &Bar) -> StructureResult<()> {
        if !self.date_started {
            return Err(StructureError::NoDateStarted);
        }
        bar.validate()?;
        self.state_mut(htf).on_bar(bar);
        Ok(())
    }

    pub fn latest_confirmed(&self, htf: Htf, kind: SwingKind) -> Option<SwingPoint> {
        let state = self.state(htf);
        match kind {
            SwingKind::High => state.confirmed_highs.back().copied(),
            SwingKind::Low => state.confirmed_lows.back().copied(),
        }
    }

    fn all_confirmed(&self, htf: Htf) -> impl Iterator<Item = SwingPoint> + '_ {
        let state = self.state(htf);
        state
            .confirmed_highs
            .iter()
            .chain(state.confirmed_lows.iter())
            .copied()
    }

    pub fn nearest_above(&self, htf: Htf, price: f64) -> Option<SwingPoint> {
        self.all_confirmed(htf)
            .filter(|p| p.price > price)
            .min_by(|a, b| (a.price - price).total_cmp(&(b.price - price)))
    }

    pub fn nearest_below(&self, htf: Htf, price: f64) -> Option<SwingPoint> {
        self.all_confirmed(htf)
            .filter(|p| p.price < price)
            .min_by(|a, b| (price - a.price).total_cmp(&(price - b.price)))
    }

    pub fn snapshot(&self) -> StructureResult<HtfSwingsSnapshot> {
        if !self.date_started {
            return Err(StructureError::NoDateStarted);
        }
        Ok(HtfSwingsSnapshot {
            symbol: self.symbol.clone(),
            h1: self.h1.snapshot(),
            h4: self.h4.snapshot(),
        })
    }

    pub fn end_date(&mut self) -> StructureResult<HtfSwingsSnapshot> {
        let snap = self.snapshot()?;
        self.date_started = false;
        Ok(snap)
    }
}
