//! Construction-time configuration for every engine in this crate.
//!
//! Nothing here is a process-wide singleton: each engine owns the config
//! value it was built with, and defaults live in `Default` impls rather
//! than a mutable global.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{StructureError, StructureResult};
use crate::timeframe::Htf;

/// One of the three sessions this core understands out of the box.
/// Downstream callers are not limited to these three; `SessionWindow::name`
/// is a plain enum here because every known deployment only ever configures
/// ASIA/LONDON/NY.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum SessionName {
    Asia,
    London,
    Ny,
}

impl SessionName {
    /// The spec's wire-format spelling, e.g. `"ASIA"`. Used verbatim inside
    /// `KeyLevel::id`.
    pub fn as_label(self) -> &'static str {
        match self {
            SessionName::Asia => "ASIA",
            SessionName::London => "LONDON",
            SessionName::Ny => "NY",
        }
    }
}

/// A session window expressed in local wall-clock time for a single IANA
/// zone. `end <= start` (textually, which for fixed-width `HH:mm` strings
/// coincides with time-of-day comparison) denotes a session that crosses
/// local midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub name: SessionName,
    pub start: String,
    pub end: String,
    pub tz_iana: String,
}

impl SessionWindow {
    pub fn new(
        name: SessionName,
        start: impl Into<String>,
        end: impl Into<String>,
        tz_iana: impl Into<String>,
    ) -> Self {
        Self {
            name,
            start: start.into(),
            end: end.into(),
            tz_iana: tz_iana.into(),
        }
    }

    /// A midnight-crossing window has its textual `end` lexicographically
    /// at-or-before its `start`.
    pub fn crosses_midnight(&self) -> bool {
        self.end.as_str() <= self.start.as_str()
    }
}

/// Per-symbol session configuration consumed by C1 and C2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsConfig {
    pub windows: Vec<SessionWindow>,
}

impl SessionsConfig {
    pub fn new(windows: Vec<SessionWindow>) -> Self {
        Self { windows }
    }

    pub fn validate(&self) -> StructureResult<()> {
        if self.windows.is_empty() {
            return Err(StructureError::InvalidConfig(
                "session windows must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The documented defaults for US index futures (ES/NQ): sessions in
    /// Chicago local time, ASIA crossing midnight.
    pub fn es_nq_chicago_default() -> Self {
        Self::new(vec![
            SessionWindow::new(SessionName::Asia, "18:00", "03:00", "America/Chicago"),
            SessionWindow::new(SessionName::London, "03:00", "09:30", "America/Chicago"),
            SessionWindow::new(SessionName::Ny, "09:30", "16:00", "America/Chicago"),
        ])
    }
}

/// Lookback/confirm/retention parameters for a single higher timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtfSwingConfig {
    pub lookback: usize,
    pub confirm: usize,
    pub keep_recent: usize,
    /// Whether incoming bars must be accumulated from `base_tf` rather than
    /// arriving already HTF-aligned. Bar aggregation itself is an external
    /// collaborator (see crate docs); this flag only records caller intent.
    pub aggregate: bool,
    pub base_tf: Option<String>,
}

impl HtfSwingConfig {
    pub fn new(lookback: usize, confirm: usize, keep_recent: usize) -> Self {
        Self {
            lookback,
            confirm,
            keep_recent,
            aggregate: false,
            base_tf: None,
        }
    }

    pub fn validate(&self) -> StructureResult<()> {
        if self.lookback == 0 {
            return Err(StructureError::InvalidConfig(
                "lookback must be >= 1".into(),
            ));
        }
        if self.keep_recent == 0 {
            return Err(StructureError::InvalidConfig(
                "keep_recent must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for HtfSwingConfig {
    fn default() -> Self {
        Self::new(2, 1, 50)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SwingConfig {
    pub h1: HtfSwingConfig,
    pub h4: HtfSwingConfig,
}

impl SwingConfig {
    pub fn validate(&self) -> StructureResult<()> {
        self.h1.validate()?;
        self.h4.validate()?;
        Ok(())
    }

    pub fn for_htf(&self, htf: Htf) -> &HtfSwingConfig {
        match htf {
            Htf::H1 => &self.h1,
            Htf::H4 => &self.h4,
        }
    }
}

/// Configuration for the BOS reversal engine (C4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BosConfig {
    pub max_windows: usize,
    pub default_duration_ms: i64,
    pub min_confidence: f64,
    /// Size of the rolling window used to normalize volume and break
    /// magnitude in the strength/confidence formulas.
    pub rolling_window: usize,
}

impl BosConfig {
    pub fn validate(&self) -> StructureResult<()> {
        if self.max_windows == 0 {
            return Err(StructureError::InvalidConfig(
                "max_windows must be >= 1".into(),
            ));
        }
        if self.default_duration_ms <= 0 {
            return Err(StructureError::InvalidConfig(
                "default_duration_ms must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(StructureError::InvalidConfig(
                "min_confidence must be in [0,1]".into(),
            ));
        }
        if self.rolling_window == 0 {
            return Err(StructureError::InvalidConfig(
                "rolling_window must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BosConfig {
    fn default() -> Self {
        Self {
            max_windows: 32,
            default_duration_ms: 4 * 60 * 60 * 1000,
            min_confidence: 0.5,
            rolling_window: 20,
        }
    }
}

/// Configuration for the equilibrium classifier (C5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumConfig {
    pub threshold: f64,
    pub min_range_size: f64,
    pub precision: u32,
}

impl EquilibriumConfig {
    pub fn validate(&self) -> StructureResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(StructureError::InvalidConfig(
                "threshold must be in [0,1]".into(),
            ));
        }
        if self.min_range_size < 0.0 {
            return Err(StructureError::InvalidConfig(
                "min_range_size must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EquilibriumConfig {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            min_range_size: 5.0,
            precision: 6,
        }
    }
}

/// Weights and thresholds driving C6's banding + scoring + sort pipeline.
///
/// Weights are free positive reals and are **not** normalized to sum to
/// 1.0 (an explicit open-question decision — see `SPEC_FULL.md` §11).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityConfig {
    pub w_source: f64,
    pub w_recency: f64,
    pub w_proximity: f64,
    pub w_confluence: f64,
    /// Proximity decay constant λ in `P = exp(-λ * ticksAway)`.
    pub proximity_lambda: f64,
    pub horizon_h1_bars: f64,
    pub horizon_h4_bars: f64,
    pub horizon_session_bars: f64,
    pub price_merge_ticks: f64,
    pub max_band_width_ticks: f64,
    pub max_levels_per_source: Option<usize>,
    pub max_targets_per_side: usize,
    pub precision: u32,
    /// Audit string recorded verbatim in `Plan.rules`.
    pub version: String,
}

impl PriorityConfig {
    pub fn validate(&self) -> StructureResult<()> {
        for (name, w) in [
            ("w_source", self.w_source),
            ("w_recency", self.w_recency),
            ("w_proximity", self.w_proximity),
            ("w_confluence", self.w_confluence),
        ] {
            if w < 0.0 {
                return Err(StructureError::InvalidConfig(format!(
                    "{name} must be >= 0, got {w}"
                )));
            }
        }
        if self.proximity_lambda < 0.0 {
            return Err(StructureError::InvalidConfig(
                "proximity_lambda must be >= 0".into(),
            ));
        }
        for (name, h) in [
            ("horizon_h1_bars", self.horizon_h1_bars),
            ("horizon_h4_bars", self.horizon_h4_bars),
            ("horizon_session_bars", self.horizon_session_bars),
        ] {
            if h <= 0.0 {
                return Err(StructureError::InvalidConfig(format!(
                    "{name} must be > 0, got {h}"
                )));
            }
        }
        if self.price_merge_ticks < 0.0 || self.max_band_width_ticks < 0.0 {
            return Err(StructureError::InvalidConfig(
                "banding thresholds must be >= 0".into(),
            ));
        }
        if self.max_targets_per_side == 0 {
            return Err(StructureError::InvalidConfig(
                "max_targets_per_side must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            w_source: 1.0,
            w_recency: 1.0,
            w_proximity: 1.0,
            w_confluence: 1.0,
            proximity_lambda: 0.05,
            horizon_h1_bars: 48.0,
            horizon_h4_bars: 30.0,
            horizon_session_bars: 24.0,
            price_merge_ticks: 4.0,
            max_band_width_ticks: 8.0,
            max_levels_per_source: None,
            max_targets_per_side: 10,
            precision: 6,
            version: "daily-bias-planner/1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chicago_default_has_three_windows() {
        let cfg = SessionsConfig::es_nq_chicago_default();
        assert_eq!(cfg.windows.len(), 3);
        assert!(cfg.windows[0].crosses_midnight());
        assert!(!cfg.windows[1].crosses_midnight());
    }

    #[test]
    fn empty_sessions_config_is_invalid() {
        assert!(SessionsConfig::new(vec![]).validate().is_err());
    }

    #[test]
    fn swing_config_rejects_zero_lookback() {
        let cfg = HtfSwingConfig::new(0, 1, 10);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn priority_config_rejects_negative_weight() {
        let mut cfg = PriorityConfig::default();
        cfg.w_source = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn priority_config_defaults_are_not_normalized() {
        let cfg = PriorityConfig::default();
        let sum = cfg.w_source + cfg.w_recency + cfg.w_proximity + cfg.w_confluence;
        assert_ne!(sum, 1.0);
    }
}
