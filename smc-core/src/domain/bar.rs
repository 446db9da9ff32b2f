//! Bar: the fundamental market data unit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::InstrumentId;

/// OHLCV bar for a single instrument over one aggregation window.
///
/// `volume` counts ticks, not traded size: the tick feed carries no size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub instrument: InstrumentId,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Open a fresh bar from a single tick.
    pub fn opened(
        instrument: impl Into<InstrumentId>,
        price: f64,
        timestamp: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            window_start: timestamp,
            window_end: timestamp + window,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1,
        }
    }

    /// Fold one more tick into this bar.
    pub fn absorb(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += 1;
    }

    /// True if `timestamp` still falls inside this bar's window.
    pub fn accepts(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp < self.window_end
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Body as a fraction of the full range. Zero-range bars have no ratio.
    pub fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        if range > 0.0 {
            Some(self.body() / range)
        } else {
            None
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}
