//! End-to-end scenarios through the public API.
//!
//! Tests:
//! 1. A clean 60-bar uptrend produces a bullish BOS by bar 55 and a LONG signal
//! 2. 49 bars is never enough, whatever the pattern
//! 3. Two cycles on identical data five minutes apart: emit, then duplicate
//! 4. A clean downtrend mirrors into a SHORT signal
//! 5. Below-threshold and no-primary outcomes never reach the dedup store

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use smc_core::config::{DedupConfig, EngineConfig, RiskConfig, StructureConfig, SynthesisConfig};
use smc_core::dedup::DedupStore;
use smc_core::domain::{Bar, Direction, PriceTick, STRUCTURE_BULLISH};
use smc_core::pipeline::{CycleOutcome, InstrumentPipeline};
use smc_core::risk::{compute_levels, RiskProfile};
use smc_core::rng::{NoJitter, SeededJitter};
use smc_core::signals::{synthesize, Synthesis};
use smc_core::structure::{analyze, Analysis};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

/// Closes rising from `from` to `to` over `n` bars, no pullbacks.
/// open = previous close, high = close, low = open.
fn monotonic_bars(n: usize, from: f64, to: f64) -> Vec<Bar> {
    let step = (to - from) / (n - 1) as f64;
    let mut prev_close = from;
    (0..n)
        .map(|i| {
            let close = from + step * i as f64;
            let open = prev_close;
            prev_close = close;
            let start = t0() + Duration::seconds(5 * i as i64);
            Bar {
                instrument: "EURUSD".into(),
                window_start: start,
                window_end: start + Duration::seconds(5),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 1,
            }
        })
        .collect()
}

fn profile() -> RiskProfile {
    RiskProfile::new(10_000.0, 0.01).unwrap()
}

fn pipeline(config: EngineConfig) -> InstrumentPipeline {
    InstrumentPipeline::new("EURUSD", Arc::new(config), Box::new(SeededJitter::new(42)))
}

/// One tick per bar window, so every tick closes the previous bar.
fn feed_closes(pipeline: &mut InstrumentPipeline, closes: &[f64]) -> DateTime<Utc> {
    let mut last = t0();
    for (i, &price) in closes.iter().enumerate() {
        last = t0() + Duration::seconds(5 * i as i64);
        pipeline
            .ingest(&PriceTick::new("EURUSD", price, last))
            .unwrap();
    }
    last
}

fn linear(n: usize, from: f64, to: f64) -> Vec<f64> {
    let step = (to - from) / (n - 1) as f64;
    (0..n).map(|i| from + step * i as f64).collect()
}

// ──────────────────────────────────────────────
// 1. Uptrend → LONG
// ──────────────────────────────────────────────

#[test]
fn uptrend_breaks_structure_by_bar_55() {
    let bars = monotonic_bars(60, 100.0, 110.0);
    let Analysis::Ready(analysis) = analyze(&bars[..=55], &StructureConfig::default()) else {
        panic!("56 bars should be enough");
    };
    assert!(analysis.bullish_bos());
    assert!(!analysis.bearish_bos());
}

#[test]
fn uptrend_synthesizes_long_signal() {
    let bars = monotonic_bars(60, 100.0, 110.0);
    let analysis = analyze(&bars, &StructureConfig::default());
    let analysis = analysis.ready().expect("60 bars");
    assert!(analysis.bullish_bos());

    let price = analysis.current_price;
    assert!((price - 110.0).abs() < 1e-9);

    let Synthesis::Candidate(draft) =
        synthesize(analysis, price, &SynthesisConfig::default(), "5s")
    else {
        panic!("expected a candidate");
    };
    assert_eq!(draft.direction, Direction::Long);
    assert!(draft.confidence >= 70);
    assert_eq!(draft.confirmations[0].id, STRUCTURE_BULLISH);

    let levels = compute_levels(
        draft.direction,
        price,
        &bars,
        &profile(),
        &RiskConfig::default(),
        &mut SeededJitter::new(1),
    )
    .unwrap();

    assert!((levels.entry - 110.0).abs() <= 110.0 * 0.0001 + 1e-9);
    assert!(levels.stop_loss < 110.0);
    let expected_tp = levels.entry + 2.0 * (levels.entry - levels.stop_loss);
    assert!((levels.take_profit - expected_tp).abs() < 1e-9);
    assert!((levels.risk_reward - 2.0).abs() < 1e-9);
}

// ──────────────────────────────────────────────
// 2. Insufficient history
// ──────────────────────────────────────────────

#[test]
fn forty_nine_bars_is_insufficient() {
    let patterns = [
        monotonic_bars(49, 100.0, 110.0),
        monotonic_bars(49, 110.0, 100.0),
        monotonic_bars(49, 100.0, 100.0 + 1e-9),
    ];
    for bars in &patterns {
        assert!(matches!(
            analyze(bars, &StructureConfig::default()),
            Analysis::InsufficientData {
                available: 49,
                required: 50
            }
        ));
    }

    let mut p = pipeline(EngineConfig::default());
    let now = feed_closes(&mut p, &linear(49, 100.0, 110.0));
    let dedup = DedupStore::new(DedupConfig::default());
    assert!(matches!(
        p.run_cycle(now, &profile(), &dedup),
        CycleOutcome::InsufficientData { .. }
    ));
}

// ──────────────────────────────────────────────
// 3. Deduplication across cycles
// ──────────────────────────────────────────────

#[test]
fn second_cycle_on_identical_data_is_duplicate() {
    let mut p = pipeline(EngineConfig::default());
    let now = feed_closes(&mut p, &linear(60, 100.0, 110.0));
    let dedup = DedupStore::new(DedupConfig::default());

    let first = p.run_cycle(now, &profile(), &dedup);
    let signal = first.signal().expect("first cycle emits");
    assert_eq!(signal.direction(), Direction::Long);
    assert!(signal.stop_loss() < 110.0);

    let second = p.run_cycle(now + Duration::minutes(5), &profile(), &dedup);
    assert_eq!(second, CycleOutcome::Duplicate);
    assert_eq!(dedup.len(), 1);
}

#[test]
fn identical_data_after_window_emits_again() {
    let mut p = pipeline(EngineConfig::default());
    let now = feed_closes(&mut p, &linear(60, 100.0, 110.0));
    let dedup = DedupStore::new(DedupConfig::default());

    assert!(p.run_cycle(now, &profile(), &dedup).signal().is_some());
    let later = now + Duration::minutes(31);
    assert!(p.run_cycle(later, &profile(), &dedup).signal().is_some());
}

// ──────────────────────────────────────────────
// 4. Downtrend → SHORT
// ──────────────────────────────────────────────

#[test]
fn downtrend_emits_short() {
    let mut p = pipeline(EngineConfig::default());
    let now = feed_closes(&mut p, &linear(60, 110.0, 100.0));
    let dedup = DedupStore::new(DedupConfig::default());

    let outcome = p.run_cycle(now, &profile(), &dedup);
    let signal = outcome.signal().expect("downtrend emits");
    assert_eq!(signal.direction(), Direction::Short);
    assert!(signal.stop_loss() > signal.entry());
    assert!(signal.take_profit() < signal.entry());
    assert!((signal.risk_reward() - 2.0).abs() < 1e-9);
}

// ──────────────────────────────────────────────
// 5. Non-emitting outcomes
// ──────────────────────────────────────────────

#[test]
fn strict_threshold_blocks_bare_break() {
    let mut config = EngineConfig::default();
    config.synthesis.min_confidence = 0.95;
    let mut p = pipeline(config);
    let now = feed_closes(&mut p, &linear(60, 100.0, 110.0));
    let dedup = DedupStore::new(DedupConfig::default());

    assert!(matches!(
        p.run_cycle(now, &profile(), &dedup),
        CycleOutcome::BelowThreshold { confidence } if confidence < 95
    ));
    assert!(dedup.is_empty());
}

#[test]
fn flat_market_never_emits() {
    let mut p = pipeline(EngineConfig::default());
    let now = feed_closes(&mut p, &[1.2345; 80]);
    let dedup = DedupStore::new(DedupConfig::default());
    assert_eq!(
        p.run_cycle(now, &profile(), &dedup),
        CycleOutcome::NoPrimaryConfirmation
    );
    assert!(dedup.is_empty());
}

#[test]
fn no_jitter_entry_equals_price() {
    let bars = monotonic_bars(60, 100.0, 110.0);
    let levels = compute_levels(
        Direction::Long,
        110.0,
        &bars,
        &profile(),
        &RiskConfig::default(),
        &mut NoJitter,
    )
    .unwrap();
    assert_eq!(levels.entry, 110.0);
}
