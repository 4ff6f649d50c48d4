//! Decision events and the recorder that collects them.

use crate::clock::Clock;
use crate::types::{RequestId, Uint};
use chrono::NaiveDateTime;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Timestamp layout used when decision events are rendered.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Terminal decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Forwarded,
    Dropped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Forwarded => "Forwarded",
            Outcome::Dropped => "Dropped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded outcome for one request.
///
/// `sequence` is the position at which the outcome was determined. Because it
/// is assigned while the bucket lock is held, ordering by `sequence` is the
/// true order of decisions, even when two actors record concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEvent {
    pub sequence: Uint,
    pub outcome: Outcome,
    pub request_id: RequestId,
    pub timestamp: NaiveDateTime,
}

impl fmt::Display for DecisionEvent {
    /// Renders as `Forwarded,3,2024/01/01 00:00:01`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{}",
            self.outcome,
            self.request_id,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

/// Forwarded/dropped counts over a set of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub forwarded: Uint,
    pub dropped: Uint,
}

impl Summary {
    pub fn of(events: &[DecisionEvent]) -> Self {
        events.iter().fold(Summary::default(), |mut summary, event| {
            match event.outcome {
                Outcome::Forwarded => summary.forwarded += 1,
                Outcome::Dropped => summary.dropped += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> Uint {
        self.forwarded + self.dropped
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} forwarded, {} dropped", self.forwarded, self.dropped)
    }
}

/// Append-only, thread-safe collector of [`DecisionEvent`]s.
///
/// Cores call [`record`](DecisionRecorder::record) while holding their own
/// state lock, so the recorder lock always nests inside a bucket lock and
/// never the other way round.
pub struct DecisionRecorder {
    clock: Arc<dyn Clock>,
    events: Mutex<Vec<DecisionEvent>>,
}

impl DecisionRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        DecisionRecorder {
            clock,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Stamps and appends a decision for `request_id`.
    pub fn record(&self, outcome: Outcome, request_id: RequestId) {
        let timestamp = self.clock.now();
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = events.len() as Uint;
        log::trace!("request {} {} (#{})", request_id, outcome, sequence);
        events.push(DecisionEvent {
            sequence,
            outcome,
            request_id,
            timestamp,
        });
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the recorder, returning events in decision order.
    pub fn finish(self) -> Vec<DecisionEvent> {
        let mut events = self
            .events
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        events.sort_by_key(|event| event.sequence);
        events
    }
}
