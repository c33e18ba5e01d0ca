//! Events emitted by the provider and consumer
//!
//! Each event renders as one fixed console line. Sinks decide where the
//! lines go: stdout for the binary, an in-memory log for tests.

use std::fmt;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex;

/// Observable state transitions of the signal cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Provider moved the flag from false to true
    Supplied,
    /// Consumer found the flag false and is about to wait
    Waiting,
    /// Consumer moved the flag from true to false
    Processed,
}

impl Event {
    pub fn as_line(&self) -> &'static str {
        match self {
            Event::Supplied => "Provider: event supplied.",
            Event::Waiting => "Consumer: waiting for event...",
            Event::Processed => "Consumer: event processed.",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_line())
    }
}

/// Destination for events. Called while the cell lock is held, so
/// implementations must not block on the cell.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Prints each event line to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: Event) {
        log::debug!("{:?}", event);
        println!("{}", event);
    }
}

/// Keeps every event in order, for inspection after a run
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
