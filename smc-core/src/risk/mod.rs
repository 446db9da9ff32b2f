//! Entry, stop, target and position size.
//!
//! Stops sit beyond the recent swing by half an ATR, or 1.5 ATR from price,
//! whichever is further. Targets sit at `reward_multiple` times the stop
//! distance, so risk/reward is fixed by configuration, not by volatility.

pub mod sizing;

pub use sizing::{floor_to_step, lot_size};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RiskConfig;
use crate::domain::{Bar, Direction, SwingKind};
use crate::indicators::atr;
use crate::rng::JitterSource;
use crate::structure::swing::{detect_swings, highest_high, last_of_kind, lowest_low};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("need {required} bars for ATR, have {available}")]
    InsufficientData { available: usize, required: usize },

    #[error("stop {stop} leaves no risk distance from entry {entry}")]
    DegenerateStop { entry: f64, stop: f64 },

    #[error("invalid risk profile: {field} = {value}")]
    InvalidProfile { field: &'static str, value: f64 },
}

/// Caller-supplied account parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    account_balance: f64,
    /// Fraction of balance risked per trade (0.01 = 1%).
    risk_pct: f64,
}

impl RiskProfile {
    pub fn new(account_balance: f64, risk_pct: f64) -> Result<Self, RiskError> {
        if !(account_balance > 0.0) || !account_balance.is_finite() {
            return Err(RiskError::InvalidProfile {
                field: "account_balance",
                value: account_balance,
            });
        }
        if !(risk_pct > 0.0 && risk_pct < 1.0) {
            return Err(RiskError::InvalidProfile {
                field: "risk_pct",
                value: risk_pct,
            });
        }
        Ok(Self {
            account_balance,
            risk_pct,
        })
    }

    pub fn account_balance(&self) -> f64 {
        self.account_balance
    }

    pub fn risk_pct(&self) -> f64 {
        self.risk_pct
    }

    pub fn money_at_risk(&self) -> f64 {
        self.account_balance * self.risk_pct
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub lot_size: f64,
    pub money_at_risk: f64,
    pub atr: f64,
}

/// Compute trade levels for `direction` at `current_price`.
///
/// `bars` is the full history ending with the current bar. Entry is
/// `current_price` plus a jitter of at most `entry_jitter * current_price`.
pub fn compute_levels(
    direction: Direction,
    current_price: f64,
    bars: &[Bar],
    profile: &RiskProfile,
    config: &RiskConfig,
    jitter: &mut dyn JitterSource,
) -> Result<RiskLevels, RiskError> {
    let atr = atr(bars, config.atr_period).ok_or(RiskError::InsufficientData {
        available: bars.len(),
        required: config.atr_period,
    })?;

    let entry = current_price + jitter.offset(current_price * config.entry_jitter);
    let swing = recent_swing(direction, bars, config);

    let stop_loss = match direction {
        Direction::Long => (swing - config.swing_buffer_atr * atr)
            .min(current_price - config.stop_atr * atr),
        Direction::Short => (swing + config.swing_buffer_atr * atr)
            .max(current_price + config.stop_atr * atr),
    };

    let risk_distance = direction.sign() * (entry - stop_loss);
    if !(risk_distance > 0.0) {
        return Err(RiskError::DegenerateStop {
            entry,
            stop: stop_loss,
        });
    }

    let take_profit = entry + direction.sign() * config.reward_multiple * risk_distance;
    let money_at_risk = profile.money_at_risk();

    Ok(RiskLevels {
        entry,
        stop_loss,
        take_profit,
        risk_reward: (take_profit - entry).abs() / risk_distance,
        lot_size: lot_size(money_at_risk, risk_distance, config),
        money_at_risk,
        atr,
    })
}

/// Most recent swing low (long) or high (short), else the extreme of the
/// `range_fallback_window` bars before the current one.
fn recent_swing(direction: Direction, bars: &[Bar], config: &RiskConfig) -> f64 {
    let kind = match direction {
        Direction::Long => SwingKind::Low,
        Direction::Short => SwingKind::High,
    };
    let swings = detect_swings(bars, config.swing_span);
    if let Some(swing) = last_of_kind(&swings, kind, 1).first() {
        return swing.price;
    }

    let last = bars.len().saturating_sub(1);
    let window = &bars[last.saturating_sub(config.range_fallback_window)..last];
    let window = if window.is_empty() { bars } else { window };
    let extreme = match kind {
        SwingKind::Low => lowest_low(window),
        SwingKind::High => highest_high(window),
    };
    // `atr` already required a non-empty history.
    extreme.unwrap_or(bars[last].close)
}
