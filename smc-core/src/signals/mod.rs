//! Signal synthesis: structure analysis in, scored trade candidate out.
//!
//! Synthesis never looks at account state. It decides direction and
//! confidence from market structure alone; risk levels are attached later.

pub mod synthesizer;

pub use synthesizer::{synthesize, SignalDraft, Synthesis};

/// Confidence points awarded by each condition.
pub mod points {
    /// Granted once any primary confirmation exists.
    pub const BASE: u8 = 30;
    pub const PRIMARY: u8 = 40;
    pub const ORDER_BLOCK: u8 = 20;
    pub const FAIR_VALUE_GAP: u8 = 15;
    pub const EQUAL_LEVELS: u8 = 10;
}

/// Display weights attached to confirmations. Presentation only.
pub mod weights {
    pub const PRIMARY: f64 = 1.0;
    pub const ORDER_BLOCK: f64 = 0.8;
    pub const FAIR_VALUE_GAP: f64 = 0.6;
    pub const EQUAL_LEVELS: f64 = 0.5;
}
