//! Seed scenario 2: a midnight-crossing ASIA session correctly attributes
//! bars on both sides of local midnight to the same trading date's window,
//! and ignores a bar that falls in the *previous* date's ASIA window.

use structure_core::config::SessionsConfig;
use structure_core::{Bar, SessionLevelsEngine};

fn bar(ts: i64, high: f64, low: f64) -> Bar {
    Bar::new(ts, (high + low) / 2.0, high, low, (high + low) / 2.0, 1.0)
}

#[test]
fn asia_session_spans_local_midnight() {
    let mut engine =
        SessionLevelsEngine::new("ES", SessionsConfig::es_nq_chicago_default()).unwrap();
    engine.start_date("2024-01-15").unwrap();

    // 19:00 Chicago on 2024-01-15 (CST, UTC-6) -> 2024-01-16T01:00:00Z, inside
    // the 2024-01-15 ASIA window (18:00 -> next-day 03:00 Chicago).
    engine
        .on_bar(&bar(1_705_366_800_000, 4510.0, 4495.0))
        .unwrap();

    let snapshot = engine.snapshot().unwrap();
    let asia = snapshot
        .levels
        .iter()
        .find(|l| l.session == structure_core::config::SessionName::Asia)
        .unwrap();
    assert_eq!(asia.high, 4510.0);
    assert_eq!(asia.low, 4495.0);
}

#[test]
fn bar_before_materialized_window_is_ignored() {
    let mut engine =
        SessionLevelsEngine::new("ES", SessionsConfig::es_nq_chicago_default()).unwrap();
    engine.start_date("2024-01-15").unwrap();

    // 19:00 Chicago on 2024-01-14 -> 2024-01-15T01:00:00Z, before this
    // date's materialized ASIA boundary (2024-01-16T00:00:00Z start).
    engine
        .on_bar(&bar(1_705_280_400_000, 9999.0, 1.0))
        .unwrap();

    let snapshot = engine.snapshot().unwrap();
    let asia = snapshot
        .levels
        .iter()
        .find(|l| l.session == structure_core::config::SessionName::Asia)
        .unwrap();
    assert!(asia.high.is_nan());
    assert!(asia.low.is_nan());
}
