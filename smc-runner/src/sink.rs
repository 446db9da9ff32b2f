//! Signal sinks.

use std::io::Write;

use thiserror::Error;

use smc_core::domain::Signal;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("serialize signal: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("write signal: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for emitted signals.
pub trait SignalSink {
    fn publish(&mut self, signal: &Signal) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonlSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SignalSink for JsonlSink<W> {
    fn publish(&mut self, signal: &Signal) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, signal)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every signal in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub signals: Vec<Signal>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSink for MemorySink {
    fn publish(&mut self, signal: &Signal) -> Result<(), SinkError> {
        self.signals.push(signal.clone());
        Ok(())
    }
}
