//! Order-block extraction.
//!
//! A bullish candidate is an up bar whose body covers at least `body_ratio`
//! of its range, confirmed when one of the next `pullback_bars` bars trades
//! below its low. Bearish is the mirror. The most recent `exclude_recent`
//! bars are never candidates since their pullback window is still open.

use crate::config::StructureConfig;
use crate::domain::{Bar, Bias, OrderBlock};

/// Most recent unmitigated order blocks, oldest first, at most
/// `config.max_order_blocks`.
pub fn detect_order_blocks(bars: &[Bar], config: &StructureConfig) -> Vec<OrderBlock> {
    let scan_end = bars.len().saturating_sub(config.exclude_recent);
    let mut blocks = Vec::new();

    for i in 0..scan_end {
        let Some(bias) = candidate_bias(&bars[i], config.body_ratio) else {
            continue;
        };

        let pullback_end = (i + config.pullback_bars).min(bars.len() - 1);
        let follow = &bars[i + 1..=pullback_end];
        let confirmed = match bias {
            Bias::Bullish => follow.iter().any(|b| b.low < bars[i].low),
            Bias::Bearish => follow.iter().any(|b| b.high > bars[i].high),
        };
        if !confirmed {
            continue;
        }

        let mut block = OrderBlock::new(
            bias,
            bars[i].high,
            bars[i].low,
            bars[i].window_start,
            i,
        );
        for later in &bars[i + 1..] {
            if block.observe_close(later.close) {
                break;
            }
        }
        if !block.is_mitigated() {
            blocks.push(block);
        }
    }

    let excess = blocks.len().saturating_sub(config.max_order_blocks);
    blocks.drain(..excess);
    blocks
}

fn candidate_bias(bar: &Bar, body_ratio: f64) -> Option<Bias> {
    if bar.body_ratio()? < body_ratio {
        return None;
    }
    if bar.is_bullish() {
        Some(Bias::Bullish)
    } else if bar.is_bearish() {
        Some(Bias::Bearish)
    } else {
        None
    }
}
