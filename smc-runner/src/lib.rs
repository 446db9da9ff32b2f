//! SMC Runner: orchestration around `smc-core`.
//!
//! This crate builds on `smc-core` to provide:
//! - TOML runner configuration (instruments, schedule, risk profile, engine)
//! - Tick sources: CSV replay files and a seeded synthetic feed
//! - Signal sinks: JSON Lines and in-memory
//! - The tick-time replay driver and the wall-clock polling loop

pub mod config;
pub mod feed;
pub mod runner;
pub mod sink;

pub use config::{ConfigError, RiskSettings, RunnerConfig, ScheduleConfig};
pub use feed::{parse_timestamp, CsvTickSource, FeedError, SyntheticFeed, SyntheticMode, TickSource};
pub use runner::{ReplaySummary, RunError, Runner};
pub use sink::{JsonlSink, MemorySink, SignalSink, SinkError};
