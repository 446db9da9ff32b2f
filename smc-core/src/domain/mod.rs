//! Domain types for the signal engine

pub mod bar;
pub mod signal;
pub mod structure;
pub mod tick;

pub use bar::Bar;
pub use signal::{
    Confirmation, ConfirmationStatus, Direction, Signal, SignalError, SignalParts, SignalStatus,
    MAX_CONFIDENCE, STRUCTURE_BEARISH, STRUCTURE_BULLISH,
};
pub use structure::{
    Bias, FairValueGap, LevelSource, OrderBlock, ReferencePair, StructureEvent, StructureKind,
    StructureLevels, SwingKind, SwingPoint,
};
pub use tick::{PriceTick, TickError};

/// Instrument identifier (e.g. "EURUSD", "XAUUSD").
pub type InstrumentId = String;
