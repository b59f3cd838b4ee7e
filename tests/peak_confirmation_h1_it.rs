//! Seed scenario 1: a lone peak on H1 with a 2-bar lookback and zero
//! confirm bars confirms immediately once both flanks are in the buffer.

use structure_core::config::{HtfSwingConfig, SwingConfig};
use structure_core::swing::SwingKind;
use structure_core::{Bar, Htf, HtfSwingsEngine};

fn bar(ts_hours: i64, high: f64) -> Bar {
    Bar::new(
        ts_hours * 3_600_000,
        high - 1.0,
        high,
        high - 2.0,
        high - 1.0,
        10.0,
    )
}

#[test]
fn confirms_swing_high_at_four_bar_peak() {
    let cfg = SwingConfig {
        h1: HtfSwingConfig::new(2, 0, 50),
        h4: HtfSwingConfig::default(),
    };
    let mut engine = HtfSwingsEngine::new("ES", cfg).unwrap();
    engine.start_date("2024-01-15").unwrap();

    for (hour, high) in [(10, 4505.0), (11, 4520.0), (12, 4518.0), (13, 4515.0)] {
        engine.on_bar(Htf::H1, &bar(hour, high)).unwrap();
    }

    let swing = engine.latest_confirmed(Htf::H1, SwingKind::High).unwrap();
    assert_eq!(swing.price, 4520.0);
    assert_eq!(swing.timestamp, 11 * 3_600_000);
}
