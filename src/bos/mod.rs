//! BOS reversal engine (C4): time-bounded windows anchored to reference
//! pivots, emitting confidence-scored break-of-structure signals.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, info};

use crate::bar::Bar;
use crate::config::BosConfig;
use crate::error::StructureResult;
use crate::math::RollingWindow;
use crate::swing::{SwingKind, SwingPoint};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum BosDirection {
    Bull,
    Bear,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum WindowStatus {
    Open,
    ClosedTriggered,
    ClosedExpired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BosWindow {
    pub id: String,
    pub reference_pivot: SwingPoint,
    pub direction: BosDirection,
    pub opened_at: i64,
    pub expires_at: i64,
    pub status: WindowStatus,
}

/// Immutable once emitted: no engine method ever revisits or mutates a
/// previously returned `BosSignal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BosSignal {
    pub window_id: String,
    pub reference_pivot: SwingPoint,
    pub direction: BosDirection,
    pub trigger_bar: Bar,
    pub confidence: f64,
    pub strength: f64,
    pub emitted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BosEngineState {
    pub symbol: String,
    pub windows: Vec<BosWindow>,
    pub bars_processed: u64,
    pub signals_emitted: u64,
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Drives BOS window lifecycle and trigger scoring for one symbol.
#[derive(Debug, Clone)]
pub struct BosReversalEngine {
    symbol: String,
    cfg: BosConfig,
    windows: VecDeque<BosWindow>,
    volume_window: RollingWindow,
    range_window: RollingWindow,
    next_id: u64,
    last_timestamp: Option<i64>,
    bars_processed: u64,
    signals_emitted: u64,
}

impl BosReversalEngine {
    pub fn new(symbol: impl Into<String>, cfg: BosConfig) -> StructureResult<Self> {
        cfg.validate()?;
        Ok(Self {
            symbol: symbol.into(),
            volume_window: RollingWindow::new(cfg.rolling_window),
            range_window: RollingWindow::new(cfg.rolling_window),
            cfg,
            windows: VecDeque::new(),
            next_id: 0,
            last_timestamp: None,
            bars_processed: 0,
            signals_emitted: 0,
        })
    }

    /// Opens a new window anchored to `reference_pivot`. Returns `None` for
    /// an unusable pivot (non-finite price or strength) rather than an
    /// error: this is a stream-level no-op, not a programmer error.
    pub fn open_window(
        &mut self,
        reference_pivot: SwingPoint,
        duration_ms: Option<i64>,
        direction: Option<BosDirection>,
    ) -> Option<BosWindow> {
        if !reference_pivot.price.is_finite() || !reference_pivot.strength.is_finite() {
            return None;
        }

        let direction = direction.unwrap_or(match reference_pivot.kind {
            SwingKind::High => BosDirection::Bear,
            SwingKind::Low => BosDirection::Bull,
        });
        let opened_at = self.last_timestamp.unwrap_or(reference_pivot.timestamp);
        let duration = duration_ms.unwrap_or(self.cfg.default_duration_ms);
        let expires_at = opened_at + duration;

        let id = format!("{}:BOS:{:08}", self.symbol, self.next_id);
        self.next_id += 1;

        let window = BosWindow {
            id,
            reference_pivot,
            direction,
            opened_at,
            expires_at,
            status: WindowStatus::Open,
        };
        self.windows.push_back(window.clone());
        self.evict_if_over_capacity();
        Some(window)
    }

    fn evict_if_over_capacity(&mut self) {
        let open_count = self
            .windows
            .iter()
            .filter(|w| w.status == WindowStatus::Open)
            .count();
        if open_count > self.cfg.max_windows {
            if let Some(pos) = self
                .windows
                .iter()
                .position(|w| w.status == WindowStatus::Open)
            {
                let evicted = self.windows.remove(pos);
                debug!(
                    symbol = %self.symbol,
                    window_id = ?evicted.map(|w| w.id),
                    "evicting oldest open BOS window over capacity"
                );
            }
        }
    }

    pub fn on_bar(&mut self, bar: &Bar) -> StructureResult<Vec<BosSignal>> {
        bar.validate()?;
        self.bars_processed += 1;
        self.volume_window.push(bar.volume);
        self.range_window.push(bar.high - bar.low);

        // Step 1: expire.
        for window in self.windows.iter_mut() {
            if window.status == WindowStatus::Open && window.expires_at <= bar.timestamp {
                window.status = WindowStatus::ClosedExpired;
                debug!(symbol = %self.symbol, window_id = %window.id, "BOS window expired");
            }
        }

        // Step 2: trigger detection on remaining open windows.
        let mut signals = Vec::new();
        for window in self.windows.iter_mut() {
            if window.status != WindowStatus::Open {
                continue;
            }
            let triggered = match window.direction {
                BosDirection::Bear => bar.low < window.reference_pivot.price,
                BosDirection::Bull => bar.high > window.reference_pivot.price,
            };
            if !triggered {
                continue;
            }

            let bullish_break = window.direction == BosDirection::Bull;
            let extreme = bar.extreme(bullish_break);
            let break_magnitude = (extreme - window.reference_pivot.price).abs()
                / window.reference_pivot.price.abs().max(f64::EPSILON);
            let range_estimate = self.range_window.mean();
            let normalized_break = if range_estimate > 0.0 {
                clamp01(break_magnitude / range_estimate)
            } else if break_magnitude > 0.0 {
                1.0
            } else {
                0.0
            };
            let volume_mean = self.volume_window.mean();
            let normalized_volume = if volume_mean > 0.0 {
                clamp01(bar.volume / volume_mean)
            } else {
                0.0
            };
            let strength = clamp01(normalized_break * 0.6 + normalized_volume * 0.4);

            let duration = (window.expires_at - window.opened_at).max(1) as f64;
            let elapsed = (bar.timestamp - window.opened_at).max(0) as f64;
            let timing_score = clamp01(1.0 - elapsed / duration);
            let pivot_strength = clamp01(window.reference_pivot.strength);
            let confidence =
                clamp01(0.5 * pivot_strength + 0.3 * normalized_volume + 0.2 * timing_score);

            if confidence < self.cfg.min_confidence {
                debug!(
                    symbol = %self.symbol,
                    window_id = %window.id,
                    confidence,
                    "BOS candidate below confidence threshold, window stays open"
                );
                continue;
            }

            window.status = WindowStatus::ClosedTriggered;
            let signal = BosSignal {
                window_id: window.id.clone(),
                reference_pivot: window.reference_pivot,
                direction: window.direction,
                trigger_bar: *bar,
                confidence,
                strength,
                emitted_at: bar.timestamp,
            };
            info!(
                symbol = %self.symbol,
                window_id = %signal.window_id,
                direction = %signal.direction,
                confidence = signal.confidence,
                "emitted BOS signal"
            );
            signals.push(signal);
        }

        self.signals_emitted += signals.len() as u64;
        self.last_timestamp = Some(bar.timestamp);
        Ok(signals)
    }

    pub fn state(&self) -> BosEngineState {
        BosEngineState {
            symbol: self.symbol.clone(),
            windows: self.windows.iter().cloned().collect(),
            bars_processed: self.bars_processed,
            signals_emitted: self.signals_emitted,
        }
    }

    /// Clears all window and rolling-statistics state. Does not reset the
    /// monotonic id counter, so window ids remain unique across resets.
    pub fn reset(&mut self) {
        self.windows.clear();
        self.volume_window.reset();
        self.range_window.reset();
        self.last_timestamp = None;
        self.bars_processed = 0;
        self.signals_emitted = 0;
    }
}
