//! Duplicate-signal suppression.
//!
//! A candidate is a duplicate when a signal for the same instrument and
//! direction went out within the dedup window and its entry, stop and target
//! are all close to the candidate's. "Close" means within the relative OR the
//! absolute tolerance, so cheap and expensive instruments are both covered.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::DedupConfig;
use crate::domain::{Direction, InstrumentId, Signal};

/// The levels of one emitted (or candidate) signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedRecord {
    pub instrument: InstrumentId,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&Signal> for EmittedRecord {
    fn from(signal: &Signal) -> Self {
        Self {
            instrument: signal.instrument().to_string(),
            direction: signal.direction(),
            entry: signal.entry(),
            stop_loss: signal.stop_loss(),
            take_profit: signal.take_profit(),
            timestamp: signal.timestamp(),
        }
    }
}

/// Relative tolerance is measured against the candidate's level.
fn close(candidate: f64, record: f64, config: &DedupConfig) -> bool {
    let diff = (candidate - record).abs();
    diff <= config.absolute_tolerance || diff <= config.relative_tolerance * candidate.abs()
}

fn within_window(candidate: &EmittedRecord, record: &EmittedRecord, config: &DedupConfig) -> bool {
    (candidate.timestamp - record.timestamp).abs() < config.window()
}

/// Whether `record` suppresses `candidate`.
pub fn is_duplicate(candidate: &EmittedRecord, record: &EmittedRecord, config: &DedupConfig) -> bool {
    record.instrument == candidate.instrument
        && record.direction == candidate.direction
        && within_window(candidate, record, config)
        && close(candidate.entry, record.entry, config)
        && close(candidate.stop_loss, record.stop_loss, config)
        && close(candidate.take_profit, record.take_profit, config)
}

/// `false` when any recently emitted record duplicates `candidate`.
pub fn should_emit(
    candidate: &EmittedRecord,
    recently_emitted: &[EmittedRecord],
    config: &DedupConfig,
) -> bool {
    !recently_emitted
        .iter()
        .any(|record| is_duplicate(candidate, record, config))
}

/// Bounded, time-evicting store of emitted signals shared across instruments.
#[derive(Debug)]
pub struct DedupStore {
    config: DedupConfig,
    records: Mutex<VecDeque<EmittedRecord>>,
}

impl DedupStore {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Record an emission. The oldest record is dropped once `max_entries` is reached.
    pub fn insert(&self, record: EmittedRecord) {
        let mut records = self.records.lock();
        push_bounded(&mut records, record, self.config.max_entries);
    }

    /// Records for `instrument`/`direction` inside the window ending at `now`.
    pub fn recent(
        &self,
        instrument: &str,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> Vec<EmittedRecord> {
        let window = self.config.window();
        self.records
            .lock()
            .iter()
            .filter(|r| {
                r.instrument == instrument
                    && r.direction == direction
                    && (now - r.timestamp).abs() < window
            })
            .cloned()
            .collect()
    }

    /// Whether `candidate` would pass the gate right now. Does not insert.
    pub fn check(&self, candidate: &EmittedRecord) -> bool {
        let records = self.records.lock();
        !records
            .iter()
            .any(|record| is_duplicate(candidate, record, &self.config))
    }

    /// Drop records older than the window at `now`. Returns how many went.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.config.window();
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.timestamp > cutoff);
        before - records.len()
    }

    /// Check and insert under a single lock. Returns `true` if admitted.
    pub fn try_admit(&self, signal: &Signal) -> bool {
        let candidate = EmittedRecord::from(signal);
        let mut records = self.records.lock();
        if records
            .iter()
            .any(|record| is_duplicate(&candidate, record, &self.config))
        {
            return false;
        }
        push_bounded(&mut records, candidate, self.config.max_entries);
        true
    }
}

fn push_bounded(records: &mut VecDeque<EmittedRecord>, record: EmittedRecord, max: usize) {
    while records.len() >= max.max(1) {
        records.pop_front();
    }
    records.push_back(record);
}
