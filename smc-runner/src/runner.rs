//! Runner: drives the engine from a tick source on a schedule.
//!
//! Two entry points:
//! - `Runner::replay()`: tick-time driven. Analysis runs whenever tick time
//!   crosses an analysis boundary, and once more after the last tick.
//! - `Runner::run_polling()`: wall-clock driven. Polls a source, ingests,
//!   analyses every `analysis_interval`, exits when the stop flag is set or
//!   the source is exhausted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use smc_core::domain::PriceTick;
use smc_core::risk::RiskProfile;
use smc_core::{OutcomeKind, SignalEngine};

use crate::config::{ConfigError, RunnerConfig};
use crate::feed::{FeedError, TickSource};
use crate::sink::{SignalSink, SinkError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Counters for one replay or polling session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub ticks_accepted: u64,
    pub ticks_rejected: u64,
    pub cycles: u64,
    pub emitted: u64,
    /// Per-instrument cycle outcomes, summed over the session.
    pub outcomes: BTreeMap<OutcomeKind, u64>,
    pub first_tick: Option<DateTime<Utc>>,
    pub last_tick: Option<DateTime<Utc>>,
}

impl ReplaySummary {
    pub fn count(&self, kind: OutcomeKind) -> u64 {
        self.outcomes.get(&kind).copied().unwrap_or(0)
    }
}

pub struct Runner {
    config: RunnerConfig,
    engine: SignalEngine,
    profile: RiskProfile,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Result<Self, RunError> {
        config.validate()?;
        let profile = config.risk.profile().map_err(ConfigError::from)?;
        let engine =
            SignalEngine::new(config.engine.clone(), config.seed).map_err(ConfigError::from)?;
        for instrument in &config.instruments {
            engine.register(instrument);
        }
        Ok(Self {
            config,
            engine,
            profile,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    /// Feed `ticks` through the engine on tick time.
    pub fn replay<I, S>(&self, ticks: I, sink: &mut S) -> Result<ReplaySummary, RunError>
    where
        I: IntoIterator<Item = PriceTick>,
        S: SignalSink + ?Sized,
    {
        let interval = self.config.schedule.analysis_interval();
        let mut summary = ReplaySummary::default();
        let mut next_analysis: Option<DateTime<Utc>> = None;

        for tick in ticks {
            let boundary = *next_analysis.get_or_insert(tick.timestamp + interval);
            if tick.timestamp >= boundary {
                self.cycle(boundary, sink, &mut summary)?;
                let mut next = boundary + interval;
                while next <= tick.timestamp {
                    next = next + interval;
                }
                next_analysis = Some(next);
            }
            self.ingest(&tick, &mut summary);
        }

        if let Some(last) = summary.last_tick {
            self.cycle(last, sink, &mut summary)?;
        }
        sink.flush()?;

        info!(
            ticks = summary.ticks_accepted,
            rejected = summary.ticks_rejected,
            cycles = summary.cycles,
            emitted = summary.emitted,
            "replay finished"
        );
        Ok(summary)
    }

    /// Poll `source` until `stop` is set or the source is exhausted.
    pub fn run_polling<T, S>(
        &self,
        source: &mut T,
        sink: &mut S,
        stop: &AtomicBool,
    ) -> Result<ReplaySummary, RunError>
    where
        T: TickSource + ?Sized,
        S: SignalSink + ?Sized,
    {
        let analysis_interval = self.config.schedule.analysis_interval();
        let poll_interval = self
            .config
            .schedule
            .bar_interval()
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(1));
        let mut summary = ReplaySummary::default();
        let mut next_analysis = Utc::now() + analysis_interval;

        info!(
            instruments = ?self.config.instruments,
            analysis_secs = self.config.schedule.analysis_interval_secs,
            "polling started"
        );

        while !stop.load(Ordering::Relaxed) {
            let batch = match source.poll() {
                Ok(batch) => batch,
                Err(FeedError::Exhausted) => {
                    debug!("tick source exhausted");
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            let idle = batch.is_empty();
            for tick in &batch {
                self.ingest(tick, &mut summary);
            }

            let now = Utc::now();
            if now >= next_analysis {
                self.cycle(now, sink, &mut summary)?;
                next_analysis = now + analysis_interval;
            }

            if idle {
                sleep_unless_stopped(poll_interval, stop);
            }
        }

        self.cycle(Utc::now(), sink, &mut summary)?;
        sink.flush()?;
        info!(
            ticks = summary.ticks_accepted,
            cycles = summary.cycles,
            emitted = summary.emitted,
            "polling stopped"
        );
        Ok(summary)
    }

    fn ingest(&self, tick: &PriceTick, summary: &mut ReplaySummary) {
        match self.engine.ingest(tick) {
            Ok(_) => {
                summary.ticks_accepted += 1;
                summary.first_tick.get_or_insert(tick.timestamp);
                summary.last_tick = Some(tick.timestamp);
            }
            // Already logged by the pipeline; the stream continues.
            Err(_) => summary.ticks_rejected += 1,
        }
    }

    fn cycle<S>(
        &self,
        now: DateTime<Utc>,
        sink: &mut S,
        summary: &mut ReplaySummary,
    ) -> Result<(), RunError>
    where
        S: SignalSink + ?Sized,
    {
        let evicted = self.engine.evict_dedup(now);
        if evicted > 0 {
            debug!(evicted, "dedup records expired");
        }

        summary.cycles += 1;
        for (instrument, outcome) in self.engine.analyze_all(now, &self.profile) {
            *summary.outcomes.entry(outcome.kind()).or_insert(0) += 1;
            if let Some(signal) = outcome.signal() {
                if let Err(err) = sink.publish(signal) {
                    warn!(instrument = %instrument, error = %err, "failed to publish signal");
                    return Err(err.into());
                }
                summary.emitted += 1;
            }
        }
        Ok(())
    }
}

fn sleep_unless_stopped(total: std::time::Duration, stop: &AtomicBool) {
    let slice = std::time::Duration::from_millis(100);
    let mut slept = std::time::Duration::ZERO;
    while slept < total && !stop.load(Ordering::Relaxed) {
        let step = slice.min(total - slept);
        std::thread::sleep(step);
        slept += step;
    }
}
