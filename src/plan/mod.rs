//! Daily bias planner (C6): collects `KeyLevel`s surfaced by C2 (session
//! levels) and C3 (HTF swings), bands nearby levels into confluences,
//! scores by source/recency/proximity/confluence, sorts on a total
//! deterministic order, and emits a ranked `Plan` of up/down price targets
//! with runtime status tracking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::info;

use crate::config::PriorityConfig;
use crate::error::{StructureError, StructureResult};
use crate::math::round_decimal;
use crate::session::SessionLevelsSnapshot;
use crate::swing::{HtfSwingsSnapshot, SwingKind};
use crate::timeframe::Htf;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum KeyLevelKind {
    SessionHigh,
    SessionLow,
    H1High,
    H1Low,
    H4High,
    H4Low,
}

impl KeyLevelKind {
    /// The spec's wire-format spelling, embedded verbatim in `KeyLevel::id`.
    pub fn as_label(self) -> &'static str {
        match self {
            KeyLevelKind::SessionHigh => "SESSION_HIGH",
            KeyLevelKind::SessionLow => "SESSION_LOW",
            KeyLevelKind::H1High => "H1_HIGH",
            KeyLevelKind::H1Low => "H1_LOW",
            KeyLevelKind::H4High => "H4_HIGH",
            KeyLevelKind::H4Low => "H4_LOW",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum KeyLevelSource {
    Session,
    H1,
    H4,
}

impl KeyLevelSource {
    /// `S` in the priority formula: `H4=3.0, H1=2.0, SESSION=1.0`.
    fn weight(self) -> f64 {
        match self {
            KeyLevelSource::H4 => 3.0,
            KeyLevelSource::H1 => 2.0,
            KeyLevelSource::Session => 1.0,
        }
    }

    /// The nominal bar duration used to turn a level's age into "bars ago"
    /// for the recency score. HTF sources use their own bar duration;
    /// session levels have no native bar series of their own, so they use
    /// a one-hour nominal unit (matching the documented `horizon_session_bars`
    /// default of 24, i.e. roughly one trading day).
    fn nominal_bar_duration_ms(self) -> i64 {
        match self {
            KeyLevelSource::H4 => Htf::H4.bar_duration_ms(),
            KeyLevelSource::H1 => Htf::H1.bar_duration_ms(),
            KeyLevelSource::Session => 3_600_000,
        }
    }

    fn horizon_bars(self, cfg: &PriorityConfig) -> f64 {
        match self {
            KeyLevelSource::H4 => cfg.horizon_h4_bars,
            KeyLevelSource::H1 => cfg.horizon_h1_bars,
            KeyLevelSource::Session => cfg.horizon_session_bars,
        }
    }
}

/// A single structural level fed into the planner, sourced from a C2 or C3
/// snapshot. `id` is deterministic and is the contract downstream systems
/// key caches and logs on — never regenerate it differently for the same
/// `(symbol, kind, session?, time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    pub id: String,
    pub symbol: String,
    pub kind: KeyLevelKind,
    pub source: KeyLevelSource,
    pub price: f64,
    pub time: i64,
    pub meta: Option<String>,
}

impl KeyLevel {
    fn session(symbol: &str, kind: KeyLevelKind, session_label: &str, price: f64, time: i64) -> Self {
        Self {
            id: format!("{symbol}:{}:{session_label}:{time}", kind.as_label()),
            symbol: symbol.to_string(),
            kind,
            source: KeyLevelSource::Session,
            price,
            time,
            meta: None,
        }
    }

    fn htf(symbol: &str, kind: KeyLevelKind, source: KeyLevelSource, price: f64, time: i64) -> Self {
        Self {
            id: format!("{symbol}:{}:{time}", kind.as_label()),
            symbol: symbol.to_string(),
            kind,
            source,
            price,
            time,
            meta: None,
        }
    }
}

/// Extracts session high/low `KeyLevel`s from a C2 snapshot. Sessions with
/// no in-window bar yet (NaN high/low) contribute nothing.
pub fn key_levels_from_session_snapshot(snapshot: &SessionLevelsSnapshot) -> Vec<KeyLevel> {
    let mut levels = Vec::new();
    for level in &snapshot.levels {
        let label = level.session.as_label();
        if !level.high.is_nan() {
            levels.push(KeyLevel::session(
                &snapshot.symbol,
                KeyLevelKind::SessionHigh,
                label,
                level.high,
                level.high_time,
            ));
        }
        if !level.low.is_nan() {
            levels.push(KeyLevel::session(
                &snapshot.symbol,
                KeyLevelKind::SessionLow,
                label,
                level.low,
                level.low_time,
            ));
        }
    }
    levels
}

/// Extracts confirmed H1/H4 swing `KeyLevel`s from a C3 snapshot. Pending
/// (unconfirmed) swings are deliberately excluded: the planner only ranks
/// structure that has already passed the non-repainting bar.
pub fn key_levels_from_swing_snapshot(snapshot: &HtfSwingsSnapshot) -> Vec<KeyLevel> {
    let mut levels = Vec::new();
    for (htf, htf_snapshot) in [(Htf::H1, &snapshot.h1), (Htf::H4, &snapshot.h4)] {
        let (source, high_kind, low_kind) = match htf {
            Htf::H1 => (KeyLevelSource::H1, KeyLevelKind::H1High, KeyLevelKind::H1Low),
            Htf::H4 => (KeyLevelSource::H4, KeyLevelKind::H4High, KeyLevelKind::H4Low),
        };
        for swing in &htf_snapshot.swing_highs {
            debug_assert_eq!(swing.kind, SwingKind::High);
            levels.push(KeyLevel::htf(&snapshot.symbol, high_kind, source, swing.price, swing.timestamp));
        }
        for swing in &htf_snapshot.swing_lows {
            debug_assert_eq!(swing.kind, SwingKind::Low);
            levels.push(KeyLevel::htf(&snapshot.symbol, low_kind, source, swing.price, swing.timestamp));
        }
    }
    levels
}

/// A confluence of adjacent levels merged during banding. `constituents`
/// preserves the price-sorted order the band was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelBand {
    pub top: f64,
    pub bottom: f64,
    pub avg_price: f64,
    pub constituents: Vec<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum Direction {
    Up,
    Down,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum PlanTargetStatus {
    Pending,
    Hit,
    Consumed,
    Invalidated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTarget {
    pub level: KeyLevel,
    pub direction: Direction,
    pub distance: f64,
    pub priority: f64,
    pub band: Option<LevelBand>,
    pub status: PlanTargetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMeta {
    pub tz: String,
    pub tick_size: f64,
    pub source_bars: Option<u64>,
}

/// Immutable ranked output of one `build()` call, except for per-target
/// `status` transitions applied through `DailyBiasPlanner::mark_level_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub symbol: String,
    pub date_local: String,
    pub current_ref: f64,
    pub created_at: i64,
    pub up_targets: Vec<PlanTarget>,
    pub down_targets: Vec<PlanTarget>,
    pub rules: Vec<String>,
    pub meta: PlanMeta,
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Single-linkage merge of price-sorted levels into confluence bands. A
/// merged group whose width exceeds the configured cap is split back into
/// individual (unbanded) levels; a group of size 1 is never a confluence.
fn band_side(mut levels: Vec<KeyLevel>, cfg: &PriorityConfig, tick_size: f64) -> Vec<(KeyLevel, Option<LevelBand>)> {
    levels.sort_by(|a, b| a.price.total_cmp(&b.price));

    let merge_gap = cfg.price_merge_ticks * tick_size;
    let max_width = cfg.max_band_width_ticks * tick_size;

    let mut groups: Vec<Vec<KeyLevel>> = Vec::new();
    for level in levels {
        let merges_into_last = groups
            .last()
            .and_then(|g| g.last())
            .map(|last| (level.price - last.price).abs() <= merge_gap)
            .unwrap_or(false);
        if merges_into_last {
            groups
                .last_mut()
                .expect("groups is non-empty: merges_into_last was true")
                .push(level);
        } else {
            groups.push(vec![level]);
        }
    }

    let mut out = Vec::new();
    for group in groups {
        if group.len() <= 1 {
            out.extend(group.into_iter().map(|l| (l, None)));
            continue;
        }

        let top = group.iter().map(|l| l.price).fold(f64::MIN, f64::max);
        let bottom = group.iter().map(|l| l.price).fold(f64::MAX, f64::min);
        if top - bottom > max_width {
            out.extend(group.into_iter().map(|l| (l, None)));
            continue;
        }

        let avg_price = round_decimal(
            group.iter().map(|l| l.price).sum::<f64>() / group.len() as f64,
            cfg.precision,
        );
        let constituents: Vec<String> = group.iter().map(|l| l.id.clone()).collect();
        let band = LevelBand {
            top,
            bottom,
            avg_price,
            constituents,
        };
        // Representative level: the constituent nearest the band average,
        // tie-broken by id so the choice is deterministic.
        let representative = group
            .into_iter()
            .min_by(|a, b| {
                (a.price - avg_price)
                    .abs()
                    .total_cmp(&(b.price - avg_price).abs())
                    .then_with(|| a.id.cmp(&b.id))
            })
            .expect("group has at least 2 elements");
        out.push((representative, Some(band)));
    }
    out
}

fn score(
    level: &KeyLevel,
    band: Option<&LevelBand>,
    current_ref: f64,
    as_of: i64,
    tick_size: f64,
    cfg: &PriorityConfig,
) -> f64 {
    let s = level.source.weight();

    let age_ms = (as_of - level.time).max(0) as f64;
    let bar_ms = level.source.nominal_bar_duration_ms() as f64;
    let age_bars = age_ms / bar_ms;
    let r = clamp01(1.0 - age_bars / level.source.horizon_bars(cfg));

    let ticks_away = (level.price - current_ref).abs() / tick_size;
    let p = (-cfg.proximity_lambda * ticks_away).exp();

    let b = match band {
        Some(band) => (1.0 + band.constituents.len() as f64).log2(),
        None => 0.0,
    };

    cfg.w_source * s + cfg.w_recency * r + cfg.w_proximity * p + cfg.w_confluence * b
}

fn build_targets(
    banded: Vec<(KeyLevel, Option<LevelBand>)>,
    direction: Direction,
    current_ref: f64,
    as_of: i64,
    tick_size: f64,
    cfg: &PriorityConfig,
) -> Vec<PlanTarget> {
    banded
        .into_iter()
        .map(|(level, band)| {
            let priority = round_decimal(
                score(&level, band.as_ref(), current_ref, as_of, tick_size, cfg),
                cfg.precision,
            );
            let distance = (level.price - current_ref).abs();
            PlanTarget {
                level,
                direction,
                distance,
                priority,
                band,
                status: PlanTargetStatus::Pending,
            }
        })
        .collect()
}

/// Total order over `PlanTarget`s: priority desc, distance asc, source
/// priority desc (H4>H1>SESSION), then `level.id` lexicographic asc. The
/// `id` tiebreaker makes the order independent of sort-implementation
/// stability across platforms.
fn compare_targets(a: &PlanTarget, b: &PlanTarget) -> std::cmp::Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| a.distance.total_cmp(&b.distance))
        .then_with(|| b.level.source.weight().total_cmp(&a.level.source.weight()))
        .then_with(|| a.level.id.cmp(&b.level.id))
}

/// Drives the six-phase collect/split/band/score/sort/cap pipeline for one
/// symbol and local trading date, and tracks runtime `PlanTarget` status
/// after `build()` has produced a `Plan`.
#[derive(Debug, Clone)]
pub struct DailyBiasPlanner {
    symbol: String,
    date_local: String,
    tick_size: f64,
    tz: String,
    cfg: PriorityConfig,
    session_levels: Vec<KeyLevel>,
    htf_swings: Vec<KeyLevel>,
    plan: Option<Plan>,
}

impl DailyBiasPlanner {
    pub fn new(
        symbol: impl Into<String>,
        date_local: impl Into<String>,
        tick_size: f64,
        tz: impl Into<String>,
        cfg: PriorityConfig,
    ) -> StructureResult<Self> {
        cfg.validate()?;
        if !(tick_size > 0.0) {
            return Err(StructureError::InvalidConfig(format!(
                "tick_size must be > 0, got {tick_size}"
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            date_local: date_local.into(),
            tick_size,
            tz: tz.into(),
            cfg,
            session_levels: Vec::new(),
            htf_swings: Vec::new(),
            plan: None,
        })
    }

    pub fn set_session_levels(&mut self, snapshot: &SessionLevelsSnapshot) {
        self.session_levels = key_levels_from_session_snapshot(snapshot);
    }

    pub fn set_htf_swings(&mut self, snapshot: &HtfSwingsSnapshot) {
        self.htf_swings = key_levels_from_swing_snapshot(snapshot);
    }

    /// Phase 1 (collect & cap): combines both inputs and, if configured,
    /// keeps only the most-recent-by-time `maxLevelsPerSource` entries per
    /// source.
    fn collect_and_cap(&self) -> Vec<KeyLevel> {
        let all: Vec<KeyLevel> = self
            .session_levels
            .iter()
            .cloned()
            .chain(self.htf_swings.iter().cloned())
            .collect();

        let Some(max) = self.cfg.max_levels_per_source else {
            return all;
        };

        let mut by_source: HashMap<KeyLevelSource, Vec<KeyLevel>> = HashMap::new();
        for level in all {
            by_source.entry(level.source).or_default().push(level);
        }
        let mut capped = Vec::new();
        for levels in by_source.values_mut() {
            levels.sort_by(|a, b| b.time.cmp(&a.time));
            levels.truncate(max);
            capped.extend(levels.drain(..));
        }
        capped
    }

    /// Runs all six phases and returns the resulting `Plan`. `as_of` is the
    /// caller-supplied "now" instant (UTC ms): the core never reads the
    /// wall clock itself, so two calls with identical arguments always
    /// produce a bitwise-identical `Plan`.
    pub fn build(
        &mut self,
        current_ref: f64,
        as_of: i64,
        source_bars: Option<u64>,
    ) -> StructureResult<Plan> {
        if !current_ref.is_finite() {
            return Err(StructureError::InvalidConfig(
                "current_ref must be finite".into(),
            ));
        }

        let all = self.collect_and_cap();
        let (up_raw, down_raw): (Vec<KeyLevel>, Vec<KeyLevel>) = all
            .into_iter()
            .filter(|l| l.price != current_ref)
            .partition(|l| l.price > current_ref);

        let up_banded = band_side(up_raw, &self.cfg, self.tick_size);
        let down_banded = band_side(down_raw, &self.cfg, self.tick_size);

        let mut up_targets = build_targets(
            up_banded,
            Direction::Up,
            current_ref,
            as_of,
            self.tick_size,
            &self.cfg,
        );
        let mut down_targets = build_targets(
            down_banded,
            Direction::Down,
            current_ref,
            as_of,
            self.tick_size,
            &self.cfg,
        );

        up_targets.sort_by(compare_targets);
        down_targets.sort_by(compare_targets);
        up_targets.truncate(self.cfg.max_targets_per_side);
        down_targets.truncate(self.cfg.max_targets_per_side);

        let rules = vec![
            format!("planner_version={}", self.cfg.version),
            format!(
                "weights: w_source={}, w_recency={}, w_proximity={}, w_confluence={}, proximity_lambda={}",
                self.cfg.w_source, self.cfg.w_recency, self.cfg.w_proximity, self.cfg.w_confluence, self.cfg.proximity_lambda
            ),
            "weights are free positive reals and are not normalized to sum to 1.0".to_string(),
            "levels exactly at current_ref are dropped from both sides".to_string(),
        ];

        let plan = Plan {
            id: format!("{}:{}", self.symbol, self.date_local),
            symbol: self.symbol.clone(),
            date_local: self.date_local.clone(),
            current_ref,
            created_at: as_of,
            up_targets,
            down_targets,
            rules,
            meta: PlanMeta {
                tz: self.tz.clone(),
                tick_size: self.tick_size,
                source_bars,
            },
        };

        info!(
            symbol = %self.symbol,
            up = plan.up_targets.len(),
            down = plan.down_targets.len(),
            "built daily bias plan"
        );

        self.plan = Some(plan.clone());
        Ok(plan)
    }

    /// Mutates only the `status` field of the matching `PlanTarget` in the
    /// most recently built `Plan`. Valid transitions are `PENDING -> HIT ->
    /// CONSUMED` and `PENDING -> INVALIDATED`; anything else fails.
    pub fn mark_level_status(
        &mut self,
        level_id: &str,
        new_status: PlanTargetStatus,
    ) -> StructureResult<()> {
        let plan = self
            .plan
            .as_mut()
            .ok_or_else(|| StructureError::UnknownLevel(level_id.to_string()))?;

        let target = plan
            .up_targets
            .iter_mut()
            .chain(plan.down_targets.iter_mut())
            .find(|t| t.level.id == level_id)
            .ok_or_else(|| StructureError::UnknownLevel(level_id.to_string()))?;

        let allowed = matches!(
            (target.status, new_status),
            (PlanTargetStatus::Pending, PlanTargetStatus::Hit)
                | (PlanTargetStatus::Hit, PlanTargetStatus::Consumed)
                | (PlanTargetStatus::Pending, PlanTargetStatus::Invalidated)
        );
        if !allowed {
            return Err(StructureError::IllegalStatusTransition {
                from: target.status.to_string(),
                to: new_status.to_string(),
            });
        }
        target.status = new_status;
        Ok(())
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PriorityConfig, SessionName};

    fn level(symbol: &str, kind: KeyLevelKind, source: KeyLevelSource, price: f64, time: i64) -> KeyLevel {
        KeyLevel {
            id: format!("{symbol}:{}:{time}", kind.as_label()),
            symbol: symbol.to_string(),
            kind,
            source,
            price,
            time,
            meta: None,
        }
    }

    fn planner(cfg: PriorityConfig) -> DailyBiasPlanner {
        DailyBiasPlanner::new("ES", "2024-01-15", 0.25, "America/Chicago", cfg).unwrap()
    }

    #[test]
    fn key_level_id_embeds_session_name() {
        let snapshot = crate::session::SessionLevelsSnapshot {
            symbol: "ES".to_string(),
            boundaries: vec![],
            levels: vec![crate::session::SessionLevels {
                session: SessionName::Ny,
                high: 4600.0,
                low: 4580.0,
                high_time: 1_000,
                low_time: 2_000,
            }],
        };
        let levels = key_levels_from_session_snapshot(&snapshot);
        assert_eq!(levels.len(), 2);
        assert!(levels.iter().any(|l| l.id == "ES:SESSION_HIGH:NY:1000"));
        assert!(levels.iter().any(|l| l.id == "ES:SESSION_LOW:NY:2000"));
    }

    #[test]
    fn split_drops_level_exactly_at_current_ref() {
        let mut planner = planner(PriorityConfig::default());
        planner.session_levels = vec![level("ES", KeyLevelKind::SessionHigh, KeyLevelSource::Session, 4600.0, 0)];
        let plan = planner.build(4600.0, 1_000_000, None).unwrap();
        assert!(plan.up_targets.is_empty());
        assert!(plan.down_targets.is_empty());
    }

    #[test]
    fn banding_merges_close_levels_into_confluence_and_sorts_deterministically() {
        let cfg = PriorityConfig {
            price_merge_ticks: 4.0,
            max_band_width_ticks: 8.0,
            ..PriorityConfig::default()
        };
        let mut planner = planner(cfg);
        planner.htf_swings = vec![
            level("ES", KeyLevelKind::H4High, KeyLevelSource::H4, 4610.0, 0),
            level("ES", KeyLevelKind::H1High, KeyLevelSource::H1, 4611.0, 0),
            level("ES", KeyLevelKind::H1Low, KeyLevelSource::H1, 4580.0, 0),
        ];
        planner.session_levels = vec![level(
            "ES",
            KeyLevelKind::SessionHigh,
            KeyLevelSource::Session,
            4640.0,
            0,
        )];

        let plan = planner.build(4600.0, 0, None).unwrap();

        assert_eq!(plan.down_targets.len(), 1);
        assert_eq!(plan.down_targets[0].level.price, 4580.0);

        assert_eq!(plan.up_targets.len(), 2);
        let top = &plan.up_targets[0];
        assert!(top.band.is_some());
        let band = top.band.as_ref().unwrap();
        assert_eq!(band.constituents.len(), 2);
        assert_eq!(plan.up_targets[1].level.price, 4640.0);

        let replay = planner.build(4600.0, 0, None).unwrap();
        assert_eq!(plan, replay);
    }

    #[test]
    fn status_transitions_follow_pending_hit_consumed_or_invalidated() {
        let cfg = PriorityConfig::default();
        let mut planner = planner(cfg);
        planner.session_levels = vec![level(
            "ES",
            KeyLevelKind::SessionHigh,
            KeyLevelSource::Session,
            4650.0,
            0,
        )];
        let plan = planner.build(4600.0, 0, None).unwrap();
        let id = plan.up_targets[0].level.id.clone();

        assert!(matches!(
            planner.mark_level_status(&id, PlanTargetStatus::Consumed),
            Err(StructureError::IllegalStatusTransition { .. })
        ));
        planner.mark_level_status(&id, PlanTargetStatus::Hit).unwrap();
        planner
            .mark_level_status(&id, PlanTargetStatus::Consumed)
            .unwrap();
    }

    #[test]
    fn band_split_back_to_individuals_when_width_exceeds_cap() {
        let cfg = PriorityConfig {
            price_merge_ticks: 100.0,
            max_band_width_ticks: 1.0,
            ..PriorityConfig::default()
        };
        let mut planner = planner(cfg);
        planner.htf_swings = vec![
            level("ES", KeyLevelKind::H1High, KeyLevelSource::H1, 4610.0, 0),
            level("ES", KeyLevelKind::H4High, KeyLevelSource::H4, 4620.0, 0),
        ];
        let plan = planner.build(4600.0, 0, None).unwrap();
        assert_eq!(plan.up_targets.len(), 2);
        assert!(plan.up_targets.iter().all(|t| t.band.is_none()));
    }

    #[test]
    fn max_levels_per_source_keeps_most_recent() {
        let cfg = PriorityConfig {
            max_levels_per_source: Some(1),
            ..PriorityConfig::default()
        };
        let mut planner = planner(cfg);
        planner.htf_swings = vec![
            level("ES", KeyLevelKind::H1High, KeyLevelSource::H1, 4610.0, 1_000),
            level("ES", KeyLevelKind::H1High, KeyLevelSource::H1, 4615.0, 2_000),
        ];
        let plan = planner.build(4600.0, 2_000, None).unwrap();
        assert_eq!(plan.up_targets.len(), 1);
        assert_eq!(plan.up_targets[0].level.time, 2_000);
    }
}
