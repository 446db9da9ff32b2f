//! Runner configuration: which instruments, how often, and whose money.
//!
//! ```toml
//! instruments = ["EURUSD", "XAUUSD"]
//! seed = 42
//!
//! [schedule]
//! analysis_interval_secs = 30
//! bar_interval_secs = 5
//!
//! [risk]
//! account_balance = 10000.0
//! risk_pct = 0.01
//!
//! [engine.synthesis]
//! min_confidence = 0.70
//! ```

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smc_core::config::{ConfigError as EngineConfigError, EngineConfig, MAX_INTERVAL_SECS};
use smc_core::risk::{RiskError, RiskProfile};

/// Errors loading or validating a [`RunnerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("engine config: {0}")]
    Engine(#[from] EngineConfigError),

    #[error("risk config: {0}")]
    Risk(#[from] RiskError),

    #[error("schedule.{field} must be in [1, {MAX_INTERVAL_SECS}]")]
    Schedule { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Instruments to track. Ticks for other instruments are still accepted.
    pub instruments: Vec<String>,
    /// Master seed for entry jitter.
    pub seed: u64,
    pub schedule: ScheduleConfig,
    pub risk: RiskSettings,
    pub engine: EngineConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            instruments: vec!["EURUSD".to_string()],
            seed: 42,
            schedule: ScheduleConfig::default(),
            risk: RiskSettings::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string. Missing sections take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.schedule.validate()?;
        self.risk.profile()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub analysis_interval_secs: u64,
    /// Polling cadence of the live loop.
    pub bar_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            analysis_interval_secs: 30,
            bar_interval_secs: 5,
        }
    }
}

impl ScheduleConfig {
    pub fn analysis_interval(&self) -> Duration {
        Duration::seconds(self.analysis_interval_secs as i64)
    }

    pub fn bar_interval(&self) -> Duration {
        Duration::seconds(self.bar_interval_secs as i64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |secs: u64| (1..=MAX_INTERVAL_SECS).contains(&secs);
        if !in_range(self.analysis_interval_secs) {
            return Err(ConfigError::Schedule {
                field: "analysis_interval_secs",
            });
        }
        if !in_range(self.bar_interval_secs) {
            return Err(ConfigError::Schedule {
                field: "bar_interval_secs",
            });
        }
        Ok(())
    }
}

/// Serializable form of [`RiskProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub account_balance: f64,
    /// Fraction of balance risked per trade (0.01 = 1%).
    pub risk_pct: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            account_balance: 10_000.0,
            risk_pct: 0.01,
        }
    }
}

impl RiskSettings {
    pub fn profile(&self) -> Result<RiskProfile, RiskError> {
        RiskProfile::new(self.account_balance, self.risk_pct)
    }
}
