//! Engine configuration.
//!
//! Every threshold the pipeline uses lives here with its default. Changing a
//! default changes which signals fire.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// Longest interval accepted for any window or schedule setting (one year).
pub const MAX_INTERVAL_SECS: u64 = 365 * 86_400;

/// Largest bar retention accepted per instrument.
pub const MAX_RETENTION: usize = 1_000_000;

fn check(field: &'static str, expected: &'static str, value: f64, ok: bool) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected,
            value,
        })
    }
}

/// Full engine configuration, one section per pipeline stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub aggregator: AggregatorConfig,
    pub structure: StructureConfig,
    pub synthesis: SynthesisConfig,
    pub risk: RiskConfig,
    pub dedup: DedupConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.aggregator.validate()?;
        self.structure.validate()?;
        self.synthesis.validate()?;
        self.risk.validate()?;
        self.dedup.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub bar_window_secs: u64,
    /// Closed bars kept per instrument.
    pub retention: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            bar_window_secs: 5,
            retention: 200,
        }
    }
}

impl AggregatorConfig {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.bar_window_secs as i64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check(
            "aggregator.bar_window_secs",
            "in [1, 31536000]",
            self.bar_window_secs as f64,
            (1..=MAX_INTERVAL_SECS).contains(&self.bar_window_secs),
        )?;
        check(
            "aggregator.retention",
            "in [1, 1000000]",
            self.retention as f64,
            (1..=MAX_RETENTION).contains(&self.retention),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Bars required before analysis runs at all.
    pub min_bars: usize,
    /// Bars on each side of a swing candidate.
    pub swing_span: usize,
    /// Minimum body/range ratio of an order-block candle.
    pub body_ratio: f64,
    /// Bars after a candidate searched for the confirming pullback.
    pub pullback_bars: usize,
    /// Most recent bars never considered as order-block candidates.
    pub exclude_recent: usize,
    pub max_order_blocks: usize,
    pub max_fair_value_gaps: usize,
    /// Equal highs/lows tolerance as a fraction of current price.
    pub equal_level_tolerance: f64,
    /// Window size for range-pivot reference levels when swings are scarce.
    pub range_fallback_window: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            min_bars: 50,
            swing_span: 3,
            body_ratio: 0.70,
            pullback_bars: 5,
            exclude_recent: 5,
            max_order_blocks: 5,
            max_fair_value_gaps: 3,
            equal_level_tolerance: 0.001,
            range_fallback_window: 10,
        }
    }
}

impl StructureConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check(
            "structure.swing_span",
            ">= 1",
            self.swing_span as f64,
            self.swing_span >= 1,
        )?;
        check(
            "structure.body_ratio",
            "in (0, 1]",
            self.body_ratio,
            self.body_ratio > 0.0 && self.body_ratio <= 1.0,
        )?;
        check(
            "structure.range_fallback_window",
            ">= 1",
            self.range_fallback_window as f64,
            self.range_fallback_window >= 1,
        )?;
        // Two fallback windows plus the current bar must fit in the minimum history.
        check(
            "structure.min_bars",
            "> 2 * range_fallback_window and > 2 * swing_span",
            self.min_bars as f64,
            self.min_bars > self.range_fallback_window.saturating_mul(2)
                && self.min_bars > self.swing_span.saturating_mul(2),
        )?;
        check(
            "structure.equal_level_tolerance",
            ">= 0",
            self.equal_level_tolerance,
            self.equal_level_tolerance >= 0.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Minimum confidence as a fraction (0.70 = 70 points).
    pub min_confidence: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.70,
        }
    }
}

impl SynthesisConfig {
    /// Threshold in whole percentage points.
    pub fn min_points(&self) -> u8 {
        (self.min_confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check(
            "synthesis.min_confidence",
            "in [0, 1]",
            self.min_confidence,
            (0.0..=1.0).contains(&self.min_confidence),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub atr_period: usize,
    /// ATR multiple placed beyond the recent swing.
    pub swing_buffer_atr: f64,
    /// ATR multiple of the volatility stop.
    pub stop_atr: f64,
    /// Target distance as a multiple of stop distance.
    pub reward_multiple: f64,
    /// Maximum entry jitter as a fraction of price.
    pub entry_jitter: f64,
    /// Account currency per unit price move for one standard lot.
    pub pip_value_per_standard_unit: f64,
    pub min_lot: f64,
    pub max_lot: f64,
    pub lot_step: f64,
    /// Bars on each side when locating the recent swing for the stop.
    pub swing_span: usize,
    /// Lookback for the recent swing extreme when no swing is detected.
    pub range_fallback_window: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            swing_buffer_atr: 0.5,
            stop_atr: 1.5,
            reward_multiple: 2.0,
            entry_jitter: 0.0001,
            pip_value_per_standard_unit: 100_000.0,
            min_lot: 0.01,
            max_lot: 100.0,
            lot_step: 0.01,
            swing_span: 3,
            range_fallback_window: 10,
        }
    }
}

impl RiskConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check(
            "risk.atr_period",
            ">= 1",
            self.atr_period as f64,
            self.atr_period >= 1,
        )?;
        check(
            "risk.stop_atr",
            "> 0",
            self.stop_atr,
            self.stop_atr > 0.0,
        )?;
        check(
            "risk.reward_multiple",
            "> 0",
            self.reward_multiple,
            self.reward_multiple > 0.0,
        )?;
        check(
            "risk.entry_jitter",
            "in [0, 0.01)",
            self.entry_jitter,
            (0.0..0.01).contains(&self.entry_jitter),
        )?;
        check(
            "risk.pip_value_per_standard_unit",
            "> 0",
            self.pip_value_per_standard_unit,
            self.pip_value_per_standard_unit > 0.0,
        )?;
        check(
            "risk.min_lot",
            "> 0 and <= max_lot",
            self.min_lot,
            self.min_lot > 0.0 && self.min_lot <= self.max_lot,
        )?;
        check(
            "risk.lot_step",
            ">= 0",
            self.lot_step,
            self.lot_step >= 0.0,
        )?;
        check(
            "risk.range_fallback_window",
            ">= 1",
            self.range_fallback_window as f64,
            self.range_fallback_window >= 1,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub window_secs: u64,
    /// Per-level relative tolerance (0.005 = 0.5%).
    pub relative_tolerance: f64,
    /// Per-level absolute tolerance in price units.
    pub absolute_tolerance: f64,
    /// Maximum entry jitter on the single regeneration attempt. Only entry
    /// moves, so at or below `relative_tolerance` the retry cannot escape.
    pub retry_jitter: f64,
    pub max_entries: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_secs: 30 * 60,
            relative_tolerance: 0.005,
            absolute_tolerance: 0.01,
            retry_jitter: 0.001,
            max_entries: 10_000,
        }
    }
}

impl DedupConfig {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check(
            "dedup.window_secs",
            "<= 31536000",
            self.window_secs as f64,
            self.window_secs <= MAX_INTERVAL_SECS,
        )?;
        check(
            "dedup.relative_tolerance",
            ">= 0",
            self.relative_tolerance,
            self.relative_tolerance >= 0.0,
        )?;
        check(
            "dedup.absolute_tolerance",
            ">= 0",
            self.absolute_tolerance,
            self.absolute_tolerance >= 0.0,
        )?;
        check(
            "dedup.retry_jitter",
            "in [0, 0.1)",
            self.retry_jitter,
            (0.0..0.1).contains(&self.retry_jitter),
        )?;
        check(
            "dedup.max_entries",
            ">= 1",
            self.max_entries as f64,
            self.max_entries >= 1,
        )
    }
}
