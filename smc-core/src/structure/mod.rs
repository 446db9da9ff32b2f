//! Market structure analysis over one instrument's bar history.
//!
//! `analyze` is pure: the same bar slice always produces the same analysis.
//! Fewer than `min_bars` bars is a normal early-lifetime state and comes back
//! as [`Analysis::InsufficientData`], never as an error.

pub mod breaks;
pub mod fvg;
pub mod order_block;
pub mod swing;

pub use breaks::{classify_break, equal_levels, reference_levels};
pub use fvg::detect_fair_value_gaps;
pub use order_block::detect_order_blocks;
pub use swing::detect_swings;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::StructureConfig;
use crate::domain::{
    Bar, Bias, FairValueGap, OrderBlock, StructureEvent, StructureKind, StructureLevels,
    SwingKind, SwingPoint,
};

/// Outcome of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis {
    InsufficientData { available: usize, required: usize },
    Ready(StructureAnalysis),
}

impl Analysis {
    pub fn ready(&self) -> Option<&StructureAnalysis> {
        match self {
            Analysis::Ready(a) => Some(a),
            Analysis::InsufficientData { .. } => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Analysis::InsufficientData { .. })
    }
}

/// Everything the synthesizer needs from one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureAnalysis {
    pub bar_count: usize,
    pub current_price: f64,
    /// Start of the most recent bar.
    pub timestamp: DateTime<Utc>,
    pub swings: Vec<SwingPoint>,
    pub levels: StructureLevels,
    pub event: Option<StructureEvent>,
    pub order_blocks: Vec<OrderBlock>,
    pub fair_value_gaps: Vec<FairValueGap>,
    pub equal_highs: bool,
    pub equal_lows: bool,
}

impl StructureAnalysis {
    fn has_event(&self, kind: StructureKind, bias: Bias) -> bool {
        self.event
            .is_some_and(|e| e.kind == kind && e.bias == bias)
    }

    pub fn bullish_bos(&self) -> bool {
        self.has_event(StructureKind::Bos, Bias::Bullish)
    }

    pub fn bearish_bos(&self) -> bool {
        self.has_event(StructureKind::Bos, Bias::Bearish)
    }

    pub fn bullish_choch(&self) -> bool {
        self.has_event(StructureKind::Choch, Bias::Bullish)
    }

    pub fn bearish_choch(&self) -> bool {
        self.has_event(StructureKind::Choch, Bias::Bearish)
    }
}

/// Run swing, break, order-block, FVG and equal-level detection.
pub fn analyze(bars: &[Bar], config: &StructureConfig) -> Analysis {
    let required = config
        .min_bars
        .max(config.range_fallback_window.saturating_mul(2).saturating_add(1))
        .max(1);
    if bars.len() < required {
        return Analysis::InsufficientData {
            available: bars.len(),
            required,
        };
    }

    let last = &bars[bars.len() - 1];
    let current_price = last.close;
    let timestamp = last.window_start;

    let swings = detect_swings(bars, config.swing_span);
    let levels = reference_levels(bars, &swings, config.range_fallback_window);
    let event = classify_break(current_price, &levels, timestamp);
    let order_blocks = detect_order_blocks(bars, config);
    let fair_value_gaps = detect_fair_value_gaps(bars, config.max_fair_value_gaps);
    let equal_highs = equal_levels(
        &swings,
        SwingKind::High,
        current_price,
        config.equal_level_tolerance,
    );
    let equal_lows = equal_levels(
        &swings,
        SwingKind::Low,
        current_price,
        config.equal_level_tolerance,
    );

    Analysis::Ready(StructureAnalysis {
        bar_count: bars.len(),
        current_price,
        timestamp,
        swings,
        levels,
        event,
        order_blocks,
        fair_value_gaps,
        equal_highs,
        equal_lows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use crate::indicators::make_bars;
    use crate::signals::{synthesize, Synthesis};

    #[test]
    fn fewer_than_min_bars_is_insufficient() {
        let closes: Vec<f64> = (0..49).map(|i| 100.0 + i as f64).collect();
        let analysis = analyze(&make_bars(&closes), &StructureConfig::default());
        assert_eq!(
            analysis,
            Analysis::InsufficientData {
                available: 49,
                required: 50
            }
        );
        assert!(analysis.ready().is_none());
    }

    #[test]
    fn empty_history_is_insufficient() {
        assert!(analyze(&[], &StructureConfig::default()).is_insufficient());
    }

    #[test]
    fn uptrend_reports_bullish_bos() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.25).collect();
        let analysis = analyze(&make_bars(&closes), &StructureConfig::default());
        let ready = analysis.ready().expect("60 bars is enough");

        assert!(ready.bullish_bos());
        assert!(!ready.bearish_bos());
        assert!(!ready.bullish_choch());
        assert_eq!(ready.bar_count, 60);
        assert_eq!(ready.current_price, closes[59]);
        assert!(ready.swings.is_empty());
    }

    #[test]
    fn downtrend_reports_bearish_bos() {
        let closes: Vec<f64> = (0..60).map(|i| 120.0 - i as f64 * 0.25).collect();
        let analysis = analyze(&make_bars(&closes), &StructureConfig::default());
        let ready = analysis.ready().unwrap();
        assert!(ready.bearish_bos());
        assert!(!ready.bearish_choch());
    }

    #[test]
    fn flat_series_has_no_event() {
        let analysis = analyze(&make_bars(&[100.0; 80]), &StructureConfig::default());
        let ready = analysis.ready().unwrap();
        assert!(ready.event.is_none());
        assert!(!ready.equal_highs);
    }

    /// Forty flat bars, then `tail`.
    fn flat_then(tail: &[f64]) -> Vec<f64> {
        let mut closes = vec![100.0; 40];
        closes.extend_from_slice(tail);
        closes
    }

    fn confirmation_ids(analysis: &StructureAnalysis) -> (u8, Vec<String>) {
        let cfg = SynthesisConfig::default();
        match synthesize(analysis, analysis.current_price, &cfg, "5s") {
            Synthesis::Candidate(d) => (
                d.confidence,
                d.confirmations.into_iter().map(|c| c.id).collect(),
            ),
            other => panic!("expected candidate, got {other:?}"),
        }
    }

    #[test]
    fn lower_low_after_higher_high_is_bearish_choch_in_order_block() {
        // Swing highs 104 then 106, swing lows 98 then 96, last close 95.
        let closes = flat_then(&[
            101.0, 102.0, 104.0, 102.0, 100.0, 98.0, 100.0, 102.0, 104.0, 106.0, 103.0, 101.0,
            100.0, 96.0, 97.0, 98.0, 99.0, 98.0, 95.0,
        ]);
        let mut bars = make_bars(&closes);
        // Strong down bar 100 -> 96 whose wick reaches below the last close.
        bars[53].low = 94.9;
        // Pullback above its high within the confirmation window.
        bars[55].high = 100.5;

        let analysis = analyze(&bars, &StructureConfig::default());
        let ready = analysis.ready().unwrap();
        assert!(ready.bearish_choch());
        assert!(!ready.bearish_bos());
        assert_eq!(ready.levels.highs.recent, 106.0);
        assert_eq!(ready.levels.lows.recent, 96.0);

        let block = ready
            .order_blocks
            .iter()
            .find(|ob| ob.bar_index == 53)
            .expect("bar 53 forms a block");
        assert_eq!(block.bias, Bias::Bearish);
        assert!(block.contains(95.0));

        let (confidence, ids) = confirmation_ids(ready);
        assert_eq!(ids, vec!["structure_bearish", "order_block_bearish"]);
        assert_eq!(confidence, 90);
    }

    #[test]
    fn higher_high_after_lower_low_is_bullish_choch_in_gap() {
        // Swing lows 96 then 94, swing highs 102 then 104, last close 105.
        let closes = flat_then(&[
            99.0, 98.0, 96.0, 98.0, 100.0, 102.0, 100.0, 98.0, 96.0, 94.0, 97.0, 99.0, 100.0,
            104.0, 103.0, 102.0, 101.0, 102.0, 105.0,
        ]);
        let mut bars = make_bars(&closes);
        // Gap up: the last bar opens above and closes on its low.
        let last = bars.len() - 1;
        bars[last].open = 105.4;
        bars[last].high = 105.5;
        bars[last].low = 105.0;

        let analysis = analyze(&bars, &StructureConfig::default());
        let ready = analysis.ready().unwrap();
        assert!(ready.bullish_choch());
        assert!(!ready.bearish_choch());

        let gap = ready.fair_value_gaps.last().unwrap();
        assert_eq!(gap.bias, Bias::Bullish);
        assert_eq!(gap.bar_index, last - 1);
        assert_eq!(gap.top, 105.0);

        let (confidence, ids) = confirmation_ids(ready);
        assert_eq!(ids, vec!["structure_bullish", "fvg_bullish"]);
        assert_eq!(confidence, 85);
    }

    #[test]
    fn analysis_is_idempotent() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0 + i as f64 * 0.05)
            .collect();
        let bars = make_bars(&closes);
        let cfg = StructureConfig::default();
        assert_eq!(analyze(&bars, &cfg), analyze(&bars, &cfg));
    }
}
