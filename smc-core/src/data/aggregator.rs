//! Tick-to-bar aggregation for one instrument.
//!
//! Bar boundaries come from tick timestamps, not the wall clock, so a replayed
//! feed produces the same bars as the live one. A bar's window starts at the
//! timestamp of the tick that opened it.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::config::AggregatorConfig;
use crate::domain::{Bar, InstrumentId};

/// Result of folding one tick into the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// The bar currently being built (includes this tick).
    pub current: Bar,
    /// The bar this tick closed, if the tick fell outside the previous window.
    pub closed: Option<Bar>,
}

/// Rolling OHLCV state for one instrument: the in-progress bar plus a ring
/// buffer of closed bars capped at `retention`.
#[derive(Debug, Clone)]
pub struct BarAggregator {
    instrument: InstrumentId,
    window: Duration,
    retention: usize,
    current: Option<Bar>,
    closed: VecDeque<Bar>,
}

impl BarAggregator {
    pub fn new(instrument: impl Into<InstrumentId>, config: &AggregatorConfig) -> Self {
        Self {
            instrument: instrument.into(),
            window: config.window(),
            retention: config.retention.max(1),
            current: None,
            closed: VecDeque::with_capacity(config.retention.max(1)),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Fold a tick into the current bar, or close it and open a new one.
    ///
    /// Timestamps are expected to be non-decreasing; an earlier timestamp is
    /// not reordered and simply lands in the current bar.
    pub fn ingest(&mut self, price: f64, timestamp: DateTime<Utc>) -> IngestOutcome {
        match self.current.as_mut() {
            Some(bar) if bar.accepts(timestamp) => {
                bar.absorb(price);
                IngestOutcome {
                    current: bar.clone(),
                    closed: None,
                }
            }
            _ => {
                let opened = Bar::opened(self.instrument.clone(), price, timestamp, self.window);
                let closed = self.current.replace(opened.clone());
                if let Some(bar) = &closed {
                    self.push_closed(bar.clone());
                }
                IngestOutcome {
                    current: opened,
                    closed,
                }
            }
        }
    }

    fn push_closed(&mut self, bar: Bar) {
        self.closed.push_back(bar);
        while self.closed.len() > self.retention {
            self.closed.pop_front();
        }
    }

    pub fn current(&self) -> Option<&Bar> {
        self.current.as_ref()
    }

    pub fn closed(&self) -> &VecDeque<Bar> {
        &self.closed
    }

    /// Closed bars followed by the in-progress bar, trimmed to `retention`.
    pub fn snapshot(&self) -> Vec<Bar> {
        let total = self.closed.len() + usize::from(self.current.is_some());
        let skip = total.saturating_sub(self.retention);
        self.closed
            .iter()
            .chain(self.current.iter())
            .skip(skip)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        (self.closed.len() + usize::from(self.current.is_some())).min(self.retention)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

/// Human label for a bar window: `5s`, `1m`, `15m`, `1h`, `1d`.
pub fn timeframe_label(window: Duration) -> String {
    let secs = window.num_seconds();
    if secs > 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs > 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
