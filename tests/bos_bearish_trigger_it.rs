//! Seed scenario 3: a BEAR window opened on a swing high triggers once a
//! bar's low breaks below the pivot, emits a confidence-scored signal, and
//! never mutates the closed window or re-emits on later bars.

use structure_core::bos::WindowStatus;
use structure_core::config::BosConfig;
use structure_core::swing::{SwingKind, SwingPoint};
use structure_core::timeframe::Htf;
use structure_core::{Bar, BosDirection, BosReversalEngine};

fn bar(ts: i64, high: f64, low: f64, volume: f64) -> Bar {
    Bar::new(ts, (high + low) / 2.0, high, low, (high + low) / 2.0, volume)
}

#[test]
fn bearish_window_triggers_and_freezes() {
    let mut engine = BosReversalEngine::new("ES", BosConfig::default()).unwrap();
    let pivot = SwingPoint {
        htf: Htf::H1,
        kind: SwingKind::High,
        price: 4520.0,
        timestamp: 0,
        bar_index: 0,
        strength: 1.0,
    };
    let window = engine.open_window(pivot, None, None).unwrap();
    assert_eq!(window.direction, BosDirection::Bear);

    for i in 0..4 {
        let signals = engine
            .on_bar(&bar(i * 60_000, 4525.0, 4521.0, 100.0))
            .unwrap();
        assert!(signals.is_empty());
    }

    let signals = engine
        .on_bar(&bar(5 * 60_000, 4519.0, 4480.0, 150.0))
        .unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].direction, BosDirection::Bear);
    assert!(signals[0].confidence >= BosConfig::default().min_confidence);

    let state = engine.state();
    let w = state.windows.iter().find(|w| w.id == window.id).unwrap();
    assert_eq!(w.status, WindowStatus::ClosedTriggered);

    let later = engine.on_bar(&bar(10 * 60_000, 4400.0, 4390.0, 10.0)).unwrap();
    assert!(later.is_empty());
    let state_after = engine.state();
    let w_after = state_after.windows.iter().find(|w| w.id == window.id).unwrap();
    assert_eq!(w_after, w);
}
