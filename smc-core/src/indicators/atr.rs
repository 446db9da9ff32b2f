//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR here is the simple mean of the last `period` true ranges, not Wilder
//! smoothing: stops are sized from the most recent window only.

use crate::domain::Bar;

/// True Range of a single bar given the previous close, if any.
pub fn bar_true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
    let high_low = bar.high - bar.low;
    match prev_close {
        Some(pc) => high_low
            .max((bar.high - pc).abs())
            .max((bar.low - pc).abs()),
        None => high_low,
    }
}

/// Mean of the last `period` true ranges.
///
/// The first bar of the window uses the close just before the window when the
/// history has one. Returns `None` with fewer than `period` bars.
pub fn atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }

    let start = bars.len() - period;
    let sum: f64 = (start..bars.len())
        .map(|i| {
            let prev_close = i.checked_sub(1).map(|p| bars[p].close);
            bar_true_range(&bars[i], prev_close)
        })
        .sum();

    Some(sum / period as f64)
}
