//! SMC Core: market-structure signal engine.
//!
//! This crate turns a stream of price ticks into risk-sized trade signals:
//! - Tick validation and time-bucketed bar aggregation per instrument
//! - Structure analysis: swings, BOS/CHoCH, order blocks, fair value gaps
//! - Confidence scoring from weighted confirmations
//! - ATR-based stop, target and lot sizing
//! - Duplicate suppression across analysis cycles
//! - A concurrent multi-instrument engine on top of per-instrument pipelines

pub mod config;
pub mod data;
pub mod dedup;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod pipeline;
pub mod risk;
pub mod rng;
pub mod signals;
pub mod structure;

pub use config::EngineConfig;
pub use engine::SignalEngine;
pub use pipeline::{CycleOutcome, InstrumentPipeline, OutcomeKind, PipelineStats};
