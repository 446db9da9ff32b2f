//! Lot sizing from a fixed risk budget.
//!
//! # Formula
//! ```text
//! money_at_risk = balance * risk_pct
//! raw_lots      = money_at_risk / (|entry - stop| * pip_value_per_standard_unit)
//! lots          = clamp(floor_to_step(raw_lots), min_lot, max_lot)
//! ```
//!
//! # Example
//! - Balance: 10,000, risk 1% (100)
//! - Stop distance: 0.0050
//! - Pip value: 100,000 per unit move
//! - Lots: 100 / (0.0050 * 100,000) = 0.20

use crate::config::RiskConfig;

/// Absorbs representation error so 0.29 / 0.01 floors to 29, not 28.
const STEP_EPSILON: f64 = 1e-9;

/// Lots for a given risk budget and stop distance.
///
/// `stop_distance` must be positive; callers reject degenerate stops first.
pub fn lot_size(money_at_risk: f64, stop_distance: f64, config: &RiskConfig) -> f64 {
    let raw = money_at_risk / (stop_distance * config.pip_value_per_standard_unit);
    floor_to_step(raw, config.lot_step).clamp(config.min_lot, config.max_lot)
}

/// Round down to a multiple of `step`. A non-positive step leaves `value` as is.
pub fn floor_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !value.is_finite() {
        return value;
    }
    let steps = (value / step + STEP_EPSILON).floor();
    // Re-round to the step's precision so 20 * 0.01 prints as 0.2.
    let decimals = (-step.log10()).ceil().max(0.0) as i32;
    let scale = 10f64.powi(decimals);
    (steps * step * scale).round() / scale
}
