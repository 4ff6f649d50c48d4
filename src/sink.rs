//! Consumers of the finalized decision sequence.
//!
//! The simulation hands its events to a [`DecisionSink`] and knows nothing
//! about where they end up. Opening files is the caller's job.

use crate::recorder::DecisionEvent;
use crate::SinkError;
use std::io::Write;

/// Opaque consumer of a completed run's decision events.
pub trait DecisionSink {
    fn accept(&mut self, events: &[DecisionEvent]) -> Result<(), SinkError>;
}

/// Writes one comma-separated record per line: `outcome,request_id,timestamp`.
///
/// # Example
///
/// ```rust
/// use rate_guard_sim::sink::{CsvSink, DecisionSink};
/// use rate_guard_sim::{DecisionEvent, Outcome};
/// use chrono::NaiveDateTime;
///
/// let event = DecisionEvent {
///     sequence: 0,
///     outcome: Outcome::Dropped,
///     request_id: 7,
///     timestamp: NaiveDateTime::default(),
/// };
///
/// let mut sink = CsvSink::new(Vec::new());
/// sink.accept(&[event]).unwrap();
/// assert_eq!(sink.into_inner(), b"Dropped,7,1970/01/01 00:00:00\n");
/// ```
pub struct CsvSink<W: Write> {
    writer: W,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        CsvSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DecisionSink for CsvSink<W> {
    fn accept(&mut self, events: &[DecisionEvent]) -> Result<(), SinkError> {
        for event in events {
            writeln!(self.writer, "{}", event)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards every record to the `log` facade at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DecisionSink for LogSink {
    fn accept(&mut self, events: &[DecisionEvent]) -> Result<(), SinkError> {
        for event in events {
            log::info!("{}", event);
        }
        Ok(())
    }
}
