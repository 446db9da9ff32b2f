//! Emitted signals and the confirmations that justify them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::structure::Bias;
use super::InstrumentId;

/// Confirmation id of a bullish primary (BOS/CHoCH) confirmation.
pub const STRUCTURE_BULLISH: &str = "structure_bullish";
/// Confirmation id of a bearish primary (BOS/CHoCH) confirmation.
pub const STRUCTURE_BEARISH: &str = "structure_bearish";

/// Hard ceiling on signal confidence, in percentage points.
pub const MAX_CONFIDENCE: u8 = 95;

/// Trade direction of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// +1 for long, -1 for short. Used to mirror price arithmetic.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl From<Bias> for Direction {
    fn from(bias: Bias) -> Self {
        match bias {
            Bias::Bullish => Direction::Long,
            Bias::Bearish => Direction::Short,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Bullish,
    Bearish,
    Neutral,
}

impl From<Bias> for ConfirmationStatus {
    fn from(bias: Bias) -> Self {
        match bias {
            Bias::Bullish => ConfirmationStatus::Bullish,
            Bias::Bearish => ConfirmationStatus::Bearish,
        }
    }
}

/// One named piece of evidence behind a signal.
///
/// `weight` is a display weight only; it never feeds the confidence arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub id: String,
    pub display_name: String,
    pub weight: f64,
    pub status: ConfirmationStatus,
    /// Running signal confidence after this confirmation fired (0–100).
    pub confidence: u8,
    pub timeframe_label: String,
}

impl Confirmation {
    pub fn is_primary(&self) -> bool {
        self.id == STRUCTURE_BULLISH || self.id == STRUCTURE_BEARISH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("signal for '{0}' has no primary structure confirmation")]
    MissingPrimaryConfirmation(InstrumentId),

    #[error("confidence {0} exceeds the {MAX_CONFIDENCE} ceiling")]
    ConfidenceOutOfRange(u8),
}

/// Everything needed to build a [`Signal`]; validated by [`Signal::new`].
#[derive(Debug, Clone)]
pub struct SignalParts {
    pub instrument: InstrumentId,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub confidence: u8,
    pub risk_reward: f64,
    pub lot_size: f64,
    pub money_at_risk: f64,
    pub timeframe_label: String,
    pub confirmations: Vec<Confirmation>,
    pub timestamp: DateTime<Utc>,
}

/// Terminal artifact of the pipeline.
///
/// Fields are private: a `Signal` can only come out of [`Signal::new`], which
/// enforces the primary-confirmation and confidence invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    id: String,
    instrument: InstrumentId,
    direction: Direction,
    entry: f64,
    stop_loss: f64,
    take_profit: f64,
    confidence: u8,
    risk_reward: f64,
    lot_size: f64,
    money_at_risk: f64,
    timeframe_label: String,
    confirmations: Vec<Confirmation>,
    timestamp: DateTime<Utc>,
    status: SignalStatus,
}

impl Signal {
    pub fn new(parts: SignalParts) -> Result<Self, SignalError> {
        if !parts.confirmations.iter().any(Confirmation::is_primary) {
            return Err(SignalError::MissingPrimaryConfirmation(parts.instrument));
        }
        if parts.confidence > MAX_CONFIDENCE {
            return Err(SignalError::ConfidenceOutOfRange(parts.confidence));
        }

        let id = signal_id(
            &parts.instrument,
            parts.direction,
            parts.timestamp,
            parts.entry,
        );

        Ok(Self {
            id,
            instrument: parts.instrument,
            direction: parts.direction,
            entry: parts.entry,
            stop_loss: parts.stop_loss,
            take_profit: parts.take_profit,
            confidence: parts.confidence,
            risk_reward: parts.risk_reward,
            lot_size: parts.lot_size,
            money_at_risk: parts.money_at_risk,
            timeframe_label: parts.timeframe_label,
            confirmations: parts.confirmations,
            timestamp: parts.timestamp,
            status: SignalStatus::Active,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn entry(&self) -> f64 {
        self.entry
    }

    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }

    pub fn take_profit(&self) -> f64 {
        self.take_profit
    }

    /// Confidence in percentage points, always within `0..=95`.
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn risk_reward(&self) -> f64 {
        self.risk_reward
    }

    pub fn lot_size(&self) -> f64 {
        self.lot_size
    }

    pub fn money_at_risk(&self) -> f64 {
        self.money_at_risk
    }

    pub fn timeframe_label(&self) -> &str {
        &self.timeframe_label
    }

    pub fn confirmations(&self) -> &[Confirmation] {
        &self.confirmations
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn status(&self) -> SignalStatus {
        self.status
    }

    /// A completed copy of this signal, for the collaborator that tracks outcomes.
    pub fn completed(mut self) -> Self {
        self.status = SignalStatus::Completed;
        self
    }
}

/// Content-addressed signal id: first 16 hex chars of a BLAKE3 digest.
fn signal_id(
    instrument: &str,
    direction: Direction,
    timestamp: DateTime<Utc>,
    entry: f64,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(instrument.as_bytes());
    hasher.update(direction.as_str().as_bytes());
    hasher.update(&timestamp.timestamp_millis().to_le_bytes());
    hasher.update(&entry.to_bits().to_le_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn primary() -> Confirmation {
        Confirmation {
            id: STRUCTURE_BULLISH.into(),
            display_name: "Bullish Break of Structure".into(),
            weight: 1.0,
            status: ConfirmationStatus::Bullish,
            confidence: 70,
            timeframe_label: "5s".into(),
        }
    }

    fn parts(confirmations: Vec<Confirmation>) -> SignalParts {
        SignalParts {
            instrument: "EURUSD".into(),
            direction: Direction::Long,
            entry: 1.1000,
            stop_loss: 1.0950,
            take_profit: 1.1100,
            confidence: 70,
            risk_reward: 2.0,
            lot_size: 0.2,
            money_at_risk: 100.0,
            timeframe_label: "5s".into(),
            confirmations,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn signal_requires_primary_confirmation() {
        let mut secondary = primary();
        secondary.id = "fvg_bullish".into();
        let err = Signal::new(parts(vec![secondary])).unwrap_err();
        assert_eq!(
            err,
            SignalError::MissingPrimaryConfirmation("EURUSD".into())
        );
    }

    #[test]
    fn signal_rejects_confidence_above_ceiling() {
        let mut p = parts(vec![primary()]);
        p.confidence = 96;
        assert!(matches!(
            Signal::new(p),
            Err(SignalError::ConfidenceOutOfRange(96))
        ));
    }

    #[test]
    fn signal_id_is_deterministic() {
        let a = Signal::new(parts(vec![primary()])).unwrap();
        let b = Signal::new(parts(vec![primary()])).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.id().len(), 16);

        let mut p = parts(vec![primary()]);
        p.entry = 1.1001;
        let c = Signal::new(p).unwrap();
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn completed_copy_keeps_levels() {
        let signal = Signal::new(parts(vec![primary()])).unwrap();
        assert_eq!(signal.status(), SignalStatus::Active);
        let done = signal.clone().completed();
        assert_eq!(done.status(), SignalStatus::Completed);
        assert_eq!(done.entry(), signal.entry());
        assert_eq!(done.id(), signal.id());
    }

    #[test]
    fn direction_serializes_uppercase() {
        let json = serde_json::to_string(&Direction::Short).unwrap();
        assert_eq!(json, "\"SHORT\"");
        assert_eq!(Direction::from(Bias::Bullish), Direction::Long);
        assert_eq!(Direction::Long.opposite(), Direction::Short);
    }
}
