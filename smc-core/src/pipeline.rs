//! One instrument's path from ticks to signals.
//!
//! A cycle runs the stages in order and stops at the first one that declines:
//!
//! ```text
//! bars -> analyze -> synthesize -> compute_levels -> dedup -> Signal
//! ```
//!
//! Every early stop is a normal outcome, never an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::data::{timeframe_label, BarAggregator, IngestOutcome};
use crate::dedup::DedupStore;
use crate::domain::{Bar, InstrumentId, PriceTick, Signal, SignalError, SignalParts, TickError};
use crate::risk::{compute_levels, RiskError, RiskLevels, RiskProfile};
use crate::rng::JitterSource;
use crate::signals::{synthesize, SignalDraft, Synthesis};
use crate::structure::{analyze, Analysis};

/// Result of one analysis cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    InsufficientData { available: usize, required: usize },
    NoPrimaryConfirmation,
    BelowThreshold { confidence: u8 },
    RiskUnavailable(RiskError),
    Duplicate,
    Emitted(Signal),
}

/// Fieldless mirror of [`CycleOutcome`], for counting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    InsufficientData,
    NoPrimaryConfirmation,
    BelowThreshold,
    RiskUnavailable,
    Duplicate,
    Emitted,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::InsufficientData => "insufficient_data",
            OutcomeKind::NoPrimaryConfirmation => "no_primary_confirmation",
            OutcomeKind::BelowThreshold => "below_threshold",
            OutcomeKind::RiskUnavailable => "risk_unavailable",
            OutcomeKind::Duplicate => "duplicate",
            OutcomeKind::Emitted => "emitted",
        }
    }
}

impl CycleOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            CycleOutcome::InsufficientData { .. } => OutcomeKind::InsufficientData,
            CycleOutcome::NoPrimaryConfirmation => OutcomeKind::NoPrimaryConfirmation,
            CycleOutcome::BelowThreshold { .. } => OutcomeKind::BelowThreshold,
            CycleOutcome::RiskUnavailable(_) => OutcomeKind::RiskUnavailable,
            CycleOutcome::Duplicate => OutcomeKind::Duplicate,
            CycleOutcome::Emitted(_) => OutcomeKind::Emitted,
        }
    }

    pub fn signal(&self) -> Option<&Signal> {
        match self {
            CycleOutcome::Emitted(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn into_signal(self) -> Option<Signal> {
        match self {
            CycleOutcome::Emitted(signal) => Some(signal),
            _ => None,
        }
    }
}

/// Per-instrument counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub ticks_accepted: u64,
    pub ticks_rejected: u64,
    pub bars_closed: u64,
    pub cycles: u64,
    pub insufficient_data: u64,
    pub no_primary_confirmation: u64,
    pub below_threshold: u64,
    pub risk_unavailable: u64,
    pub dedup_retries: u64,
    pub duplicates: u64,
    pub emitted: u64,
}

impl PipelineStats {
    fn record(&mut self, kind: OutcomeKind) {
        self.cycles += 1;
        let counter = match kind {
            OutcomeKind::InsufficientData => &mut self.insufficient_data,
            OutcomeKind::NoPrimaryConfirmation => &mut self.no_primary_confirmation,
            OutcomeKind::BelowThreshold => &mut self.below_threshold,
            OutcomeKind::RiskUnavailable => &mut self.risk_unavailable,
            OutcomeKind::Duplicate => &mut self.duplicates,
            OutcomeKind::Emitted => &mut self.emitted,
        };
        *counter += 1;
    }
}

/// Aggregator, validation watermark, jitter and counters for one instrument.
pub struct InstrumentPipeline {
    instrument: InstrumentId,
    config: Arc<EngineConfig>,
    aggregator: BarAggregator,
    last_accepted: Option<DateTime<Utc>>,
    jitter: Box<dyn JitterSource>,
    stats: PipelineStats,
}

impl std::fmt::Debug for InstrumentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentPipeline")
            .field("instrument", &self.instrument)
            .field("bars", &self.aggregator.len())
            .field("last_accepted", &self.last_accepted)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl InstrumentPipeline {
    pub fn new(
        instrument: impl Into<InstrumentId>,
        config: Arc<EngineConfig>,
        jitter: Box<dyn JitterSource>,
    ) -> Self {
        let instrument = instrument.into();
        let aggregator = BarAggregator::new(instrument.clone(), &config.aggregator);
        Self {
            instrument,
            config,
            aggregator,
            last_accepted: None,
            jitter,
            stats: PipelineStats::default(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn aggregator(&self) -> &BarAggregator {
        &self.aggregator
    }

    pub fn bars(&self) -> Vec<Bar> {
        self.aggregator.snapshot()
    }

    /// Validate and fold a tick. Rejected ticks leave the pipeline untouched.
    pub fn ingest(&mut self, tick: &PriceTick) -> Result<IngestOutcome, TickError> {
        if let Err(err) = tick.validate(self.last_accepted) {
            self.stats.ticks_rejected += 1;
            warn!(instrument = %self.instrument, error = %err, "tick rejected");
            return Err(err);
        }

        self.last_accepted = Some(tick.timestamp);
        self.stats.ticks_accepted += 1;
        let outcome = self.aggregator.ingest(tick.price, tick.timestamp);
        if outcome.closed.is_some() {
            self.stats.bars_closed += 1;
        }
        Ok(outcome)
    }

    /// Run analysis, synthesis, risk and dedup once at `now`.
    pub fn run_cycle(
        &mut self,
        now: DateTime<Utc>,
        profile: &RiskProfile,
        dedup: &DedupStore,
    ) -> CycleOutcome {
        let outcome = self.evaluate(now, profile, dedup);
        self.stats.record(outcome.kind());
        self.log_outcome(&outcome);
        outcome
    }

    fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        profile: &RiskProfile,
        dedup: &DedupStore,
    ) -> CycleOutcome {
        let bars = self.aggregator.snapshot();
        let config = Arc::clone(&self.config);

        let analysis = match analyze(&bars, &config.structure) {
            Analysis::Ready(analysis) => analysis,
            Analysis::InsufficientData {
                available,
                required,
            } => {
                return CycleOutcome::InsufficientData {
                    available,
                    required,
                }
            }
        };

        let label = timeframe_label(self.aggregator.window());
        let draft = match synthesize(
            &analysis,
            analysis.current_price,
            &config.synthesis,
            &label,
        ) {
            Synthesis::Candidate(draft) => draft,
            Synthesis::NoPrimaryConfirmation => return CycleOutcome::NoPrimaryConfirmation,
            Synthesis::BelowThreshold { confidence, .. } => {
                return CycleOutcome::BelowThreshold { confidence }
            }
        };

        let first = match self.candidate(&draft, &bars, profile, config.risk.entry_jitter, now) {
            Ok(signal) => signal,
            Err(outcome) => return outcome,
        };
        if dedup.try_admit(&first) {
            return CycleOutcome::Emitted(first);
        }

        // One regeneration with a wider entry perturbation before giving up.
        // Stops do not move with entry, so unless retry_jitter exceeds the
        // relative tolerance the retry stays a duplicate.
        self.stats.dedup_retries += 1;
        debug!(instrument = %self.instrument, "duplicate candidate, retrying once");
        let retry_jitter = dedup.config().retry_jitter;
        let second = match self.candidate(&draft, &bars, profile, retry_jitter, now) {
            Ok(signal) => signal,
            Err(outcome) => return outcome,
        };
        if dedup.try_admit(&second) {
            CycleOutcome::Emitted(second)
        } else {
            CycleOutcome::Duplicate
        }
    }

    fn candidate(
        &mut self,
        draft: &SignalDraft,
        bars: &[Bar],
        profile: &RiskProfile,
        entry_jitter: f64,
        now: DateTime<Utc>,
    ) -> Result<Signal, CycleOutcome> {
        let mut risk = self.config.risk.clone();
        risk.entry_jitter = entry_jitter;

        let levels = compute_levels(
            draft.direction,
            draft.price,
            bars,
            profile,
            &risk,
            self.jitter.as_mut(),
        )
        .map_err(CycleOutcome::RiskUnavailable)?;

        build_signal(&self.instrument, draft, &levels, now).map_err(|err| {
            warn!(instrument = %self.instrument, error = %err, "candidate failed validation");
            CycleOutcome::NoPrimaryConfirmation
        })
    }

    fn log_outcome(&self, outcome: &CycleOutcome) {
        let instrument = self.instrument.as_str();
        match outcome {
            CycleOutcome::Emitted(signal) => info!(
                instrument,
                id = signal.id(),
                direction = %signal.direction(),
                confidence = signal.confidence(),
                entry = signal.entry(),
                stop_loss = signal.stop_loss(),
                take_profit = signal.take_profit(),
                lot_size = signal.lot_size(),
                "signal emitted"
            ),
            CycleOutcome::BelowThreshold { confidence } => debug!(
                instrument,
                confidence,
                reason = outcome.kind().as_str(),
                "no signal"
            ),
            CycleOutcome::RiskUnavailable(err) => debug!(
                instrument,
                error = %err,
                reason = outcome.kind().as_str(),
                "no signal"
            ),
            _ => debug!(instrument, reason = outcome.kind().as_str(), "no signal"),
        }
    }
}

fn build_signal(
    instrument: &str,
    draft: &SignalDraft,
    levels: &RiskLevels,
    timestamp: DateTime<Utc>,
) -> Result<Signal, SignalError> {
    Signal::new(SignalParts {
        instrument: instrument.to_string(),
        direction: draft.direction,
        entry: levels.entry,
        stop_loss: levels.stop_loss,
        take_profit: levels.take_profit,
        confidence: draft.confidence,
        risk_reward: levels.risk_reward,
        lot_size: levels.lot_size,
        money_at_risk: levels.money_at_risk,
        timeframe_label: draft.timeframe_label.clone(),
        confirmations: draft.confirmations.clone(),
        timestamp,
    })
}
