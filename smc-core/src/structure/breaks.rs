//! Break-of-structure and change-of-character classification.
//!
//! Reference levels are the two most recent swing highs and lows. When a
//! side has fewer than two swings (a clean trend leaves no interior
//! extremes) the two preceding bar windows stand in as range pivots.

use chrono::{DateTime, Utc};

use crate::domain::{
    Bar, Bias, LevelSource, ReferencePair, StructureEvent, StructureKind, StructureLevels,
    SwingKind, SwingPoint,
};

use super::swing::{highest_high, last_of_kind, lowest_low};

/// Swings considered per side when building reference levels.
const RECENT_SWINGS: usize = 3;

/// Build reference highs and lows from swings, falling back to range pivots.
///
/// Callers guarantee `bars.len() > 2 * fallback_window`.
pub fn reference_levels(
    bars: &[Bar],
    swings: &[SwingPoint],
    fallback_window: usize,
) -> StructureLevels {
    let highs = last_of_kind(swings, SwingKind::High, RECENT_SWINGS);
    let lows = last_of_kind(swings, SwingKind::Low, RECENT_SWINGS);

    StructureLevels {
        highs: pair_from_swings(&highs)
            .unwrap_or_else(|| range_pivots(bars, fallback_window, SwingKind::High)),
        lows: pair_from_swings(&lows)
            .unwrap_or_else(|| range_pivots(bars, fallback_window, SwingKind::Low)),
    }
}

fn pair_from_swings(swings: &[SwingPoint]) -> Option<ReferencePair> {
    match swings {
        [.., previous, recent] => Some(ReferencePair {
            recent: recent.price,
            previous: previous.price,
            source: LevelSource::Swings,
        }),
        _ => None,
    }
}

/// Extremes of the two `window`-bar blocks preceding the last bar.
fn range_pivots(bars: &[Bar], window: usize, kind: SwingKind) -> ReferencePair {
    let last = bars.len().saturating_sub(1);
    let recent_start = last.saturating_sub(window);
    let previous_start = recent_start.saturating_sub(window);

    let recent_block = &bars[recent_start..last];
    let previous_block = &bars[previous_start..recent_start];

    let extreme = |block: &[Bar]| match kind {
        SwingKind::High => highest_high(block),
        SwingKind::Low => lowest_low(block),
    };

    let recent = extreme(recent_block).unwrap_or(f64::NAN);
    let previous = extreme(previous_block).unwrap_or(recent);

    ReferencePair {
        recent,
        previous,
        source: LevelSource::RangeFallback,
    }
}

/// Classify the current price against the reference levels.
///
/// Bullish BOS: price above the recent high and the recent high above the
/// previous one. Bullish CHoCH: a bullish BOS while the lows also broke
/// (recent low below previous low). Bearish is the mirror. CHoCH wins over
/// BOS within a direction; if both directions qualify the larger relative
/// break wins.
pub fn classify_break(
    current_price: f64,
    levels: &StructureLevels,
    timestamp: DateTime<Utc>,
) -> Option<StructureEvent> {
    let bullish = bullish_break(current_price, levels).map(|kind| StructureEvent {
        kind,
        bias: Bias::Bullish,
        reference_price: levels.highs.recent,
        timestamp,
    });
    let bearish = bearish_break(current_price, levels).map(|kind| StructureEvent {
        kind,
        bias: Bias::Bearish,
        reference_price: levels.lows.recent,
        timestamp,
    });

    match (bullish, bearish) {
        (Some(bull), Some(bear)) => Some(stronger_break(current_price, bull, bear)),
        (bull, bear) => bull.or(bear),
    }
}

fn bullish_break(price: f64, levels: &StructureLevels) -> Option<StructureKind> {
    let highs = levels.highs;
    let bos = price > highs.recent && highs.recent > highs.previous;
    if !bos {
        return None;
    }
    if levels.lows.recent < levels.lows.previous {
        Some(StructureKind::Choch)
    } else {
        Some(StructureKind::Bos)
    }
}

fn bearish_break(price: f64, levels: &StructureLevels) -> Option<StructureKind> {
    let lows = levels.lows;
    let bos = price < lows.recent && lows.recent < lows.previous;
    if !bos {
        return None;
    }
    if levels.highs.recent > levels.highs.previous {
        Some(StructureKind::Choch)
    } else {
        Some(StructureKind::Bos)
    }
}

fn stronger_break(price: f64, bull: StructureEvent, bear: StructureEvent) -> StructureEvent {
    match (bull.kind, bear.kind) {
        (StructureKind::Choch, StructureKind::Bos) => return bull,
        (StructureKind::Bos, StructureKind::Choch) => return bear,
        _ => {}
    }
    let bull_distance = (price - bull.reference_price) / bull.reference_price.abs();
    let bear_distance = (bear.reference_price - price) / bear.reference_price.abs();
    if bear_distance > bull_distance {
        bear
    } else {
        bull
    }
}

/// True if the two most recent swings of `kind` differ by less than
/// `tolerance * current_price`.
pub fn equal_levels(
    swings: &[SwingPoint],
    kind: SwingKind,
    current_price: f64,
    tolerance: f64,
) -> bool {
    match last_of_kind(swings, kind, 2).as_slice() {
        [a, b] => (a.price - b.price).abs() < tolerance * current_price,
        _ => false,
    }
}
