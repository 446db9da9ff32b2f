//! Multi-instrument signal engine.
//!
//! Each instrument gets its own [`InstrumentPipeline`]; the only state shared
//! between instruments is the dedup store. Pipelines are created on first
//! tick, and analysis across instruments runs in parallel on rayon.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::debug;

use crate::config::{ConfigError, EngineConfig};
use crate::data::IngestOutcome;
use crate::dedup::DedupStore;
use crate::domain::{Bar, InstrumentId, PriceTick, TickError};
use crate::pipeline::{CycleOutcome, InstrumentPipeline, PipelineStats};
use crate::risk::RiskProfile;
use crate::rng::SeedHierarchy;

#[derive(Debug)]
pub struct SignalEngine {
    config: Arc<EngineConfig>,
    seeds: SeedHierarchy,
    pipelines: DashMap<InstrumentId, InstrumentPipeline>,
    dedup: Arc<DedupStore>,
}

impl SignalEngine {
    /// Validate `config` and build an engine whose jitter derives from `seed`.
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        let dedup = Arc::new(DedupStore::new(config.dedup.clone()));
        Self::with_dedup(config, seed, dedup)
    }

    /// Same as [`SignalEngine::new`] but sharing an existing dedup store.
    pub fn with_dedup(
        config: EngineConfig,
        seed: u64,
        dedup: Arc<DedupStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            seeds: SeedHierarchy::new(seed),
            pipelines: DashMap::new(),
            dedup,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dedup(&self) -> &Arc<DedupStore> {
        &self.dedup
    }

    /// Create the pipeline for `instrument` if it does not exist yet.
    pub fn register(&self, instrument: &str) {
        if !self.pipelines.contains_key(instrument) {
            self.pipelines
                .entry(instrument.to_string())
                .or_insert_with(|| self.new_pipeline(instrument));
        }
    }

    fn new_pipeline(&self, instrument: &str) -> InstrumentPipeline {
        debug!(instrument, "creating pipeline");
        InstrumentPipeline::new(
            instrument,
            Arc::clone(&self.config),
            Box::new(self.seeds.jitter_for(instrument)),
        )
    }

    /// Route a tick to its instrument's pipeline.
    pub fn ingest(&self, tick: &PriceTick) -> Result<IngestOutcome, TickError> {
        if let Some(mut pipeline) = self.pipelines.get_mut(tick.instrument.as_str()) {
            return pipeline.ingest(tick);
        }
        self.pipelines
            .entry(tick.instrument.clone())
            .or_insert_with(|| self.new_pipeline(&tick.instrument))
            .ingest(tick)
    }

    /// Run one cycle for `instrument`. `None` if it has never been seen.
    pub fn analyze(
        &self,
        instrument: &str,
        now: DateTime<Utc>,
        profile: &RiskProfile,
    ) -> Option<CycleOutcome> {
        let mut pipeline = self.pipelines.get_mut(instrument)?;
        Some(pipeline.run_cycle(now, profile, &self.dedup))
    }

    /// Run one cycle for every instrument, in parallel. Sorted by instrument.
    pub fn analyze_all(
        &self,
        now: DateTime<Utc>,
        profile: &RiskProfile,
    ) -> Vec<(InstrumentId, CycleOutcome)> {
        self.instruments()
            .into_par_iter()
            .filter_map(|instrument| {
                let outcome = self.analyze(&instrument, now, profile)?;
                Some((instrument, outcome))
            })
            .collect()
    }

    pub fn bars(&self, instrument: &str) -> Option<Vec<Bar>> {
        self.pipelines.get(instrument).map(|p| p.bars())
    }

    pub fn stats(&self, instrument: &str) -> Option<PipelineStats> {
        self.pipelines.get(instrument).map(|p| p.stats().clone())
    }

    /// Drop expired dedup records. Returns how many were removed.
    pub fn evict_dedup(&self, now: DateTime<Utc>) -> usize {
        self.dedup.evict_expired(now)
    }

    /// Known instruments, sorted.
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self.pipelines.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap()
    }

    fn profile() -> RiskProfile {
        RiskProfile::new(10_000.0, 0.01).unwrap()
    }

    fn feed(engine: &SignalEngine, instrument: &str, start: f64, step: f64, bars: usize) {
        for i in 0..bars {
            let ts = t0() + Duration::seconds(5 * i as i64);
            engine
                .ingest(&PriceTick::new(instrument, start + step * i as f64, ts))
                .unwrap();
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = EngineConfig::default();
        cfg.structure.body_ratio = 0.0;
        assert!(SignalEngine::new(cfg, 1).is_err());
    }

    #[test]
    fn pipelines_are_created_per_instrument() {
        let engine = SignalEngine::new(EngineConfig::default(), 42).unwrap();
        feed(&engine, "XAUUSD", 2000.0, 1.0, 3);
        feed(&engine, "EURUSD", 1.1, 0.0001, 5);
        assert_eq!(engine.instruments(), vec!["EURUSD", "XAUUSD"]);
        assert_eq!(engine.bars("EURUSD").unwrap().len(), 5);
        assert_eq!(engine.stats("XAUUSD").unwrap().ticks_accepted, 3);
        assert!(engine.bars("GBPUSD").is_none());
        assert!(engine.analyze("GBPUSD", t0(), &profile()).is_none());
    }

    #[test]
    fn out_of_order_is_per_instrument() {
        let engine = SignalEngine::new(EngineConfig::default(), 42).unwrap();
        engine
            .ingest(&PriceTick::new("EURUSD", 1.1, t0() + Duration::seconds(10)))
            .unwrap();
        // Earlier timestamp on another instrument is fine.
        engine.ingest(&PriceTick::new("GBPUSD", 1.3, t0())).unwrap();
        assert!(engine.ingest(&PriceTick::new("EURUSD", 1.1, t0())).is_err());
    }

    #[test]
    fn analyze_all_is_sorted_and_independent() {
        let engine = SignalEngine::new(EngineConfig::default(), 42).unwrap();
        feed(&engine, "UP", 100.0, 0.2, 60);
        feed(&engine, "DOWN", 100.0, -0.2, 60);
        feed(&engine, "SHORT", 100.0, 0.2, 10);
        engine.register("EMPTY");

        let now = t0() + Duration::minutes(5);
        let outcomes = engine.analyze_all(now, &profile());
        let names: Vec<&str> = outcomes.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, vec!["DOWN", "EMPTY", "SHORT", "UP"]);

        let signal = |idx: usize| outcomes[idx].1.signal().cloned();
        assert_eq!(
            signal(0).unwrap().direction(),
            crate::domain::Direction::Short
        );
        assert!(matches!(
            outcomes[1].1,
            CycleOutcome::InsufficientData { available: 0, .. }
        ));
        assert!(matches!(
            outcomes[2].1,
            CycleOutcome::InsufficientData { available: 10, .. }
        ));
        assert_eq!(signal(3).unwrap().direction(), crate::domain::Direction::Long);
        assert_eq!(engine.dedup().len(), 2);
    }

    #[test]
    fn same_seed_same_signals() {
        let run = || {
            let engine = SignalEngine::new(EngineConfig::default(), 7).unwrap();
            feed(&engine, "EURUSD", 100.0, 0.2, 60);
            engine
                .analyze("EURUSD", t0() + Duration::minutes(5), &profile())
                .and_then(CycleOutcome::into_signal)
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn evict_dedup_clears_old_records() {
        let engine = SignalEngine::new(EngineConfig::default(), 42).unwrap();
        feed(&engine, "EURUSD", 100.0, 0.2, 60);
        let now = t0() + Duration::minutes(5);
        assert!(engine.analyze("EURUSD", now, &profile()).unwrap().signal().is_some());
        assert_eq!(engine.evict_dedup(now + Duration::minutes(10)), 0);
        assert_eq!(engine.evict_dedup(now + Duration::minutes(31)), 1);
    }
}
