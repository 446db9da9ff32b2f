//! Market structure primitives produced by the analyzer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Polarity shared by structure events, order blocks and fair value gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    High,
    Low,
}

/// Local extremum of closes over a symmetric window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub kind: SwingKind,
    pub price: f64,
    pub bar_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Break of structure: continuation.
    Bos,
    /// Change of character: the opposite swing broke as well.
    Choch,
}

/// The single structural classification reported by one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureEvent {
    pub kind: StructureKind,
    pub bias: Bias,
    /// The swing level that price broke through.
    pub reference_price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Where the reference levels for break classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    Swings,
    /// Not enough swings: extremes of the two preceding bar windows.
    RangeFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePair {
    pub recent: f64,
    pub previous: f64,
    pub source: LevelSource,
}

/// Reference highs and lows the break classification was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureLevels {
    pub highs: ReferencePair,
    pub lows: ReferencePair,
}

/// Zone left by a strong directional bar that price later revisited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub bias: Bias,
    pub price_high: f64,
    pub price_low: f64,
    pub formed_at: DateTime<Utc>,
    pub bar_index: usize,
    mitigated: bool,
}

impl OrderBlock {
    pub fn new(
        bias: Bias,
        price_high: f64,
        price_low: f64,
        formed_at: DateTime<Utc>,
        bar_index: usize,
    ) -> Self {
        Self {
            bias,
            price_high,
            price_low,
            formed_at,
            bar_index,
            mitigated: false,
        }
    }

    pub fn is_mitigated(&self) -> bool {
        self.mitigated
    }

    /// Feed a closing price. A close through the opposite boundary mitigates
    /// the block; once mitigated it stays mitigated.
    pub fn observe_close(&mut self, close: f64) -> bool {
        let through = match self.bias {
            Bias::Bullish => close < self.price_low,
            Bias::Bearish => close > self.price_high,
        };
        if through {
            self.mitigated = true;
        }
        self.mitigated
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.price_low && price <= self.price_high
    }
}

/// Three-bar imbalance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub bias: Bias,
    pub top: f64,
    pub bottom: f64,
    pub formed_at: DateTime<Utc>,
    /// Index of the middle bar.
    pub bar_index: usize,
}

impl FairValueGap {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.bottom && price <= self.top
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn block(bias: Bias) -> OrderBlock {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        OrderBlock::new(bias, 101.0, 100.0, at, 10)
    }

    #[test]
    fn bullish_block_mitigates_on_close_below_low() {
        let mut ob = block(Bias::Bullish);
        assert!(!ob.observe_close(100.5));
        assert!(!ob.observe_close(100.0));
        assert!(ob.observe_close(99.9));
        assert!(ob.is_mitigated());
    }

    #[test]
    fn mitigation_never_reverts() {
        let mut ob = block(Bias::Bearish);
        assert!(ob.observe_close(101.5));
        assert!(ob.observe_close(100.5));
        assert!(ob.is_mitigated());
    }

    #[test]
    fn zone_bounds_are_inclusive() {
        let ob = block(Bias::Bullish);
        assert!(ob.contains(100.0));
        assert!(ob.contains(101.0));
        assert!(!ob.contains(101.01));
    }
}
