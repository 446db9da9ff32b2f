//! Fair value gaps: three-bar imbalances.
//!
//! Bullish at `i` when `bar[i-1].high < bar[i+1].low`; the gap spans from the
//! first bar's high up to the third bar's low. Bearish is the mirror.

use crate::domain::{Bar, Bias, FairValueGap};

/// The `max` most recent gaps, oldest first.
pub fn detect_fair_value_gaps(bars: &[Bar], max: usize) -> Vec<FairValueGap> {
    if bars.len() < 3 || max == 0 {
        return Vec::new();
    }

    let mut gaps: Vec<FairValueGap> = (1..bars.len() - 1)
        .rev()
        .filter_map(|i| gap_at(bars, i))
        .take(max)
        .collect();
    gaps.reverse();
    gaps
}

fn gap_at(bars: &[Bar], i: usize) -> Option<FairValueGap> {
    let before = &bars[i - 1];
    let after = &bars[i + 1];

    if before.high < after.low {
        Some(FairValueGap {
            bias: Bias::Bullish,
            top: after.low,
            bottom: before.high,
            formed_at: after.window_start,
            bar_index: i,
        })
    } else if before.low > after.high {
        Some(FairValueGap {
            bias: Bias::Bearish,
            top: before.low,
            bottom: after.high,
            formed_at: after.window_start,
            bar_index: i,
        })
    } else {
        None
    }
}
