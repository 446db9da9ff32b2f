//! Tick sources.
//!
//! The engine never fetches prices itself; a [`TickSource`] is polled by the
//! runner. Two sources ship here: CSV files for replay and a seeded synthetic
//! feed for demos and tests.

use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use smc_core::domain::PriceTick;

/// Errors from tick sources.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("open tick file '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read ticks: {0}")]
    Csv(#[from] csv::Error),

    #[error("feed exhausted")]
    Exhausted,
}

/// Anything that can be polled for new ticks.
pub trait TickSource {
    /// Ticks that arrived since the last poll. An empty batch is normal.
    fn poll(&mut self) -> Result<Vec<PriceTick>, FeedError>;
}

#[derive(Debug, Deserialize)]
struct TickRow {
    instrument: String,
    price: f64,
    timestamp: String,
}

/// Parse an RFC 3339 timestamp or integer epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// Ticks from a CSV with header `instrument,price,timestamp`.
///
/// Rows that fail to parse are skipped with a warning; price and ordering
/// checks are left to the pipeline.
#[derive(Debug, Clone)]
pub struct CsvTickSource {
    pending: VecDeque<PriceTick>,
    batch_size: usize,
    skipped: usize,
}

impl CsvTickSource {
    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        let file = std::fs::File::open(path).map_err(|source| FeedError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeedError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut pending = VecDeque::new();
        let mut skipped = 0;
        for (idx, row) in rdr.deserialize::<TickRow>().enumerate() {
            // Header is line 1.
            let line = idx + 2;
            let row = match row {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    warn!(line, error = %err, "skipping malformed tick row");
                    skipped += 1;
                    continue;
                }
            };
            match parse_timestamp(&row.timestamp) {
                Some(timestamp) => {
                    pending.push_back(PriceTick::new(row.instrument, row.price, timestamp))
                }
                None => {
                    warn!(line, timestamp = %row.timestamp, "skipping tick with bad timestamp");
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            pending,
            batch_size: usize::MAX,
            skipped,
        })
    }

    /// Deliver at most `batch_size` ticks per poll.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// All remaining ticks at once.
    pub fn into_ticks(self) -> Vec<PriceTick> {
        self.pending.into()
    }
}

impl TickSource for CsvTickSource {
    fn poll(&mut self) -> Result<Vec<PriceTick>, FeedError> {
        let n = self.batch_size.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }
}

/// Shape of a synthetic price path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticMode {
    /// Seeded random walk with returns in `[-volatility, volatility]`.
    Walk { volatility: f64 },
    /// Strictly monotonic: each tick moves price by `step_pct` (negative for down).
    Trend { step_pct: f64 },
}

#[derive(Debug, Clone)]
struct SyntheticPath {
    instrument: String,
    price: f64,
    rng: StdRng,
}

/// Deterministic synthetic ticks, one per instrument per poll.
///
/// Each instrument's path is seeded from BLAKE3 over the master seed and the
/// instrument name, so adding an instrument never changes another's path.
#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    paths: Vec<SyntheticPath>,
    mode: SyntheticMode,
    clock: DateTime<Utc>,
    interval: Duration,
    remaining: Option<usize>,
}

impl SyntheticFeed {
    pub fn new(
        instruments: &[String],
        start_price: f64,
        mode: SyntheticMode,
        seed: u64,
        start: DateTime<Utc>,
        interval: Duration,
    ) -> Self {
        let paths = instruments
            .iter()
            .map(|instrument| {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&seed.to_le_bytes());
                hasher.update(instrument.as_bytes());
                let seed_bytes: [u8; 32] = *hasher.finalize().as_bytes();
                SyntheticPath {
                    instrument: instrument.clone(),
                    price: start_price,
                    rng: StdRng::from_seed(seed_bytes),
                }
            })
            .collect();
        Self {
            paths,
            mode,
            clock: start,
            interval,
            remaining: None,
        }
    }

    /// Stop after `polls` polls; later polls return [`FeedError::Exhausted`].
    pub fn with_limit(mut self, polls: usize) -> Self {
        self.remaining = Some(polls);
        self
    }

    /// Drain the feed into a flat, time-ordered tick list.
    pub fn take(&mut self, polls: usize) -> Vec<PriceTick> {
        let mut out = Vec::with_capacity(polls * self.paths.len());
        for _ in 0..polls {
            match self.poll() {
                Ok(batch) => out.extend(batch),
                Err(_) => break,
            }
        }
        out
    }

    fn step(mode: SyntheticMode, path: &mut SyntheticPath) -> f64 {
        let change = match mode {
            SyntheticMode::Walk { volatility } if volatility > 0.0 => {
                path.rng.gen_range(-volatility..volatility)
            }
            SyntheticMode::Walk { .. } => 0.0,
            SyntheticMode::Trend { step_pct } => step_pct,
        };
        path.price = (path.price * (1.0 + change)).max(f64::MIN_POSITIVE);
        path.price
    }
}

impl TickSource for SyntheticFeed {
    fn poll(&mut self) -> Result<Vec<PriceTick>, FeedError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(FeedError::Exhausted);
            }
            *remaining -= 1;
        }

        let timestamp = self.clock;
        self.clock = self.clock + self.interval;
        let mode = self.mode;
        Ok(self
            .paths
            .iter_mut()
            .map(|path| {
                let price = path.price;
                Self::step(mode, path);
                PriceTick::new(path.instrument.clone(), price, timestamp)
            })
            .collect())
    }
}
