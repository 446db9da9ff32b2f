//! Price ticks and tick validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::InstrumentId;

/// A single price observation delivered by the external feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub instrument: InstrumentId,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Reasons a tick is dropped at the pipeline boundary.
///
/// Rejection is local: the tick is discarded and the stream continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickError {
    #[error("non-positive or non-finite price {price} for '{instrument}'")]
    InvalidPrice { instrument: InstrumentId, price: f64 },

    #[error("out-of-order tick for '{instrument}': {timestamp} is before {last_accepted}")]
    OutOfOrder {
        instrument: InstrumentId,
        timestamp: DateTime<Utc>,
        last_accepted: DateTime<Utc>,
    },
}

impl PriceTick {
    pub fn new(instrument: impl Into<InstrumentId>, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            instrument: instrument.into(),
            price,
            timestamp,
        }
    }

    /// Validate against the last accepted timestamp for the same instrument.
    ///
    /// Equal timestamps are accepted; only strictly earlier ones are rejected.
    pub fn validate(&self, last_accepted: Option<DateTime<Utc>>) -> Result<(), TickError> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(TickError::InvalidPrice {
                instrument: self.instrument.clone(),
                price: self.price,
            });
        }
        if let Some(last) = last_accepted {
            if self.timestamp < last {
                return Err(TickError::OutOfOrder {
                    instrument: self.instrument.clone(),
                    timestamp: self.timestamp,
                    last_accepted: last,
                });
            }
        }
        Ok(())
    }
}
