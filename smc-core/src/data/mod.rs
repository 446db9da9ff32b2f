//! Data layer: tick ingestion and bar aggregation.

pub mod aggregator;

pub use aggregator::{timeframe_label, BarAggregator, IngestOutcome};
