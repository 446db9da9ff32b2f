//! Swing detection on closing prices.
//!
//! A swing high at `i` is a close strictly above every close within `span`
//! bars on both sides; a swing low is the mirror. The first and last `span`
//! bars can never be swings because their window is incomplete.

use crate::domain::{Bar, SwingKind, SwingPoint};

/// All swing points in bar order.
pub fn detect_swings(bars: &[Bar], span: usize) -> Vec<SwingPoint> {
    let n = bars.len();
    if span == 0 || n < span.saturating_mul(2).saturating_add(1) {
        return Vec::new();
    }

    let mut swings = Vec::new();
    for i in span..n - span {
        let close = bars[i].close;
        let neighbours = (1..=span).flat_map(|j| [bars[i - j].close, bars[i + j].close]);

        let mut is_high = true;
        let mut is_low = true;
        for other in neighbours {
            is_high &= close > other;
            is_low &= close < other;
        }

        if is_high {
            swings.push(SwingPoint {
                kind: SwingKind::High,
                price: close,
                bar_index: i,
            });
        } else if is_low {
            swings.push(SwingPoint {
                kind: SwingKind::Low,
                price: close,
                bar_index: i,
            });
        }
    }
    swings
}

/// The last `count` swings of one kind, oldest first.
pub fn last_of_kind(swings: &[SwingPoint], kind: SwingKind, count: usize) -> Vec<SwingPoint> {
    let mut picked: Vec<SwingPoint> = swings
        .iter()
        .rev()
        .filter(|s| s.kind == kind)
        .take(count)
        .copied()
        .collect();
    picked.reverse();
    picked
}

/// Highest high over `bars`.
pub fn highest_high(bars: &[Bar]) -> Option<f64> {
    bars.iter().map(|b| b.high).reduce(f64::max)
}

/// Lowest low over `bars`.
pub fn lowest_low(bars: &[Bar]) -> Option<f64> {
    bars.iter().map(|b| b.low).reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn finds_isolated_peak_and_trough() {
        let closes = [
            100.0, 101.0, 102.0, 105.0, 102.0, 101.0, 100.0, 98.0, 95.0, 97.0, 98.0, 99.0,
        ];
        let bars = make_bars(&closes);
        let swings = detect_swings(&bars, 3);

        assert_eq!(swings.len(), 2);
        assert_eq!(swings[0].kind, SwingKind::High);
        assert_eq!(swings[0].bar_index, 3);
        assert_eq!(swings[0].price, 105.0);
        assert_eq!(swings[1].kind, SwingKind::Low);
        assert_eq!(swings[1].bar_index, 8);
    }

    #[test]
    fn monotonic_series_has_no_swings() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
        assert!(detect_swings(&make_bars(&closes), 3).is_empty());
    }

    #[test]
    fn plateau_is_not_a_swing() {
        let closes = [100.0, 101.0, 102.0, 103.0, 103.0, 102.0, 101.0, 100.0];
        assert!(detect_swings(&make_bars(&closes), 3).is_empty());
    }

    #[test]
    fn edges_are_excluded() {
        // The global max sits inside the first `span` bars.
        let closes = [110.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0];
        assert!(detect_swings(&make_bars(&closes), 3).is_empty());
    }

    #[test]
    fn short_series_returns_empty() {
        assert!(detect_swings(&make_bars(&[1.0, 2.0, 1.0]), 3).is_empty());
    }

    #[test]
    fn last_of_kind_keeps_order() {
        let closes = [
            100.0, 101.0, 102.0, 106.0, 102.0, 101.0, 100.0, 101.0, 102.0, 104.0, 102.0, 101.0,
            100.0,
        ];
        let swings = detect_swings(&make_bars(&closes), 3);
        let highs = last_of_kind(&swings, SwingKind::High, 3);
        assert_eq!(highs.len(), 2);
        assert_eq!(highs[0].price, 106.0);
        assert_eq!(highs[1].price, 104.0);
        assert_eq!(last_of_kind(&swings, SwingKind::High, 1)[0].price, 104.0);
    }

    #[test]
    fn range_extremes() {
        let bars = make_bars(&[100.0, 102.0, 99.0]);
        assert!((highest_high(&bars).unwrap() - 102.1).abs() < 1e-9);
        assert!((lowest_low(&bars).unwrap() - 98.9).abs() < 1e-9);
        assert_eq!(highest_high(&[]), None);
    }
}
