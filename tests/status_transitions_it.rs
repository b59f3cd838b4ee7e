//! Seed scenario 6: a fresh `PlanTarget` starts `PENDING`; `HIT` then
//! `CONSUMED` succeeds, but jumping straight to `CONSUMED` fails.

use structure_core::config::PriorityConfig;
use structure_core::{DailyBiasPlanner, PlanTargetStatus, StructureError};

#[test]
fn pending_to_hit_to_consumed_succeeds_but_skipping_hit_fails() {
    let mut planner =
        DailyBiasPlanner::new("ES", "2024-01-15", 0.25, "America/Chicago", PriorityConfig::default())
            .unwrap();
    planner.set_session_levels(&structure_core::SessionLevelsSnapshot {
        symbol: "ES".to_string(),
        boundaries: vec![],
        levels: vec![],
    });

    // Inject a level directly through a second planner call isn't possible
    // with the public surface alone (levels flow only through C2/C3
    // snapshots), so build a plan from a one-off swing snapshot instead.
    let swing = structure_core::SwingPoint {
        htf: structure_core::Htf::H4,
        kind: structure_core::SwingKind::High,
        price: 4650.0,
        timestamp: 0,
        bar_index: 0,
        strength: 1.0,
    };
    let snapshot = structure_core::HtfSwingsSnapshot {
        symbol: "ES".to_string(),
        h1: structure_core::HtfSnapshot {
            swing_highs: vec![],
            swing_lows: vec![],
            pending_high: None,
            pending_low: None,
            metrics: structure_core::SwingMetrics::default(),
        },
        h4: structure_core::HtfSnapshot {
            swing_highs: vec![swing],
            swing_lows: vec![],
            pending_high: None,
            pending_low: None,
            metrics: structure_core::SwingMetrics::default(),
        },
    };
    planner.set_htf_swings(&snapshot);

    let plan = planner.build(4600.0, 0, None).unwrap();
    let target = &plan.up_targets[0];
    assert_eq!(target.status, PlanTargetStatus::Pending);
    let id = target.level.id.clone();

    let illegal = planner.mark_level_status(&id, PlanTargetStatus::Consumed);
    assert!(matches!(
        illegal,
        Err(StructureError::IllegalStatusTransition { .. })
    ));

    planner.mark_level_status(&id, PlanTargetStatus::Hit).unwrap();
    planner
        .mark_level_status(&id, PlanTargetStatus::Consumed)
        .unwrap();
}
