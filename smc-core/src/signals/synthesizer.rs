//! Confirmation scoring.
//!
//! # Scoring
//! ```text
//! base (primary present)         30
//! BOS / CHoCH in direction       +40
//! price in matching order block  +20
//! price in matching FVG          +15
//! equal lows (long) / highs      +10
//! cap                             95
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::SynthesisConfig;
use crate::domain::{
    Bias, Confirmation, ConfirmationStatus, Direction, StructureKind, MAX_CONFIDENCE,
    STRUCTURE_BEARISH, STRUCTURE_BULLISH,
};
use crate::structure::StructureAnalysis;

use super::{points, weights};

/// A scored candidate awaiting risk levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalDraft {
    pub direction: Direction,
    pub confidence: u8,
    pub confirmations: Vec<Confirmation>,
    pub price: f64,
    pub timeframe_label: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Synthesis {
    NoPrimaryConfirmation,
    BelowThreshold { direction: Direction, confidence: u8 },
    Candidate(SignalDraft),
}

/// Score an analysis at `current_price`.
pub fn synthesize(
    analysis: &StructureAnalysis,
    current_price: f64,
    config: &SynthesisConfig,
    timeframe_label: &str,
) -> Synthesis {
    let Some(event) = analysis.event else {
        debug!(bars = analysis.bar_count, "no primary confirmation");
        return Synthesis::NoPrimaryConfirmation;
    };

    let bias = event.bias;
    let direction = Direction::from(bias);
    let mut score = Scorecard::new(bias, timeframe_label);

    let (primary_id, primary_name) = primary_names(bias, event.kind);
    score.fire(primary_id, primary_name, weights::PRIMARY, points::BASE + points::PRIMARY);

    if analysis
        .order_blocks
        .iter()
        .any(|ob| ob.bias == bias && !ob.is_mitigated() && ob.contains(current_price))
    {
        let (id, name) = match bias {
            Bias::Bullish => ("order_block_bullish", "Bullish Order Block"),
            Bias::Bearish => ("order_block_bearish", "Bearish Order Block"),
        };
        score.fire(id, name, weights::ORDER_BLOCK, points::ORDER_BLOCK);
    }

    if analysis
        .fair_value_gaps
        .iter()
        .any(|gap| gap.bias == bias && gap.contains(current_price))
    {
        let (id, name) = match bias {
            Bias::Bullish => ("fvg_bullish", "Bullish Fair Value Gap"),
            Bias::Bearish => ("fvg_bearish", "Bearish Fair Value Gap"),
        };
        score.fire(id, name, weights::FAIR_VALUE_GAP, points::FAIR_VALUE_GAP);
    }

    let equal_support = match bias {
        Bias::Bullish => analysis
            .equal_lows
            .then_some(("equal_lows_support", "Equal Lows Support")),
        Bias::Bearish => analysis
            .equal_highs
            .then_some(("equal_highs_resistance", "Equal Highs Resistance")),
    };
    if let Some((id, name)) = equal_support {
        score.fire(id, name, weights::EQUAL_LEVELS, points::EQUAL_LEVELS);
    }

    let confidence = score.total;
    if confidence < config.min_points() {
        debug!(%direction, confidence, "below confidence threshold");
        return Synthesis::BelowThreshold {
            direction,
            confidence,
        };
    }

    Synthesis::Candidate(SignalDraft {
        direction,
        confidence,
        confirmations: score.confirmations,
        price: current_price,
        timeframe_label: timeframe_label.to_string(),
        timestamp: analysis.timestamp,
    })
}

fn primary_names(bias: Bias, kind: StructureKind) -> (&'static str, &'static str) {
    match (bias, kind) {
        (Bias::Bullish, StructureKind::Bos) => (STRUCTURE_BULLISH, "Bullish Break of Structure"),
        (Bias::Bullish, StructureKind::Choch) => {
            (STRUCTURE_BULLISH, "Bullish Change of Character")
        }
        (Bias::Bearish, StructureKind::Bos) => (STRUCTURE_BEARISH, "Bearish Break of Structure"),
        (Bias::Bearish, StructureKind::Choch) => {
            (STRUCTURE_BEARISH, "Bearish Change of Character")
        }
    }
}

/// Running total plus the confirmations that produced it, in firing order.
struct Scorecard<'a> {
    status: ConfirmationStatus,
    timeframe_label: &'a str,
    total: u8,
    confirmations: Vec<Confirmation>,
}

impl<'a> Scorecard<'a> {
    fn new(bias: Bias, timeframe_label: &'a str) -> Self {
        Self {
            status: bias.into(),
            timeframe_label,
            total: 0,
            confirmations: Vec::new(),
        }
    }

    fn fire(&mut self, id: &str, display_name: &str, weight: f64, awarded: u8) {
        self.total = self.total.saturating_add(awarded).min(MAX_CONFIDENCE);
        self.confirmations.push(Confirmation {
            id: id.to_string(),
            display_name: display_name.to_string(),
            weight,
            status: self.status,
            confidence: self.total,
            timeframe_label: self.timeframe_label.to_string(),
        });
    }
}
