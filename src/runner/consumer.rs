//! Consumer loop
//!
//! Waits for the readiness flag, clears it, then sleeps with the lock
//! released. Ends when the stop token fires or the cell is closed.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::coordination::{Consumption, SignalCell, StopToken};
use crate::events::EventSink;

pub struct Consumer {
    cell: Arc<SignalCell>,
    sink: Arc<dyn EventSink>,
    stop: StopToken,
    period: Duration,
}

impl Consumer {
    pub fn new(cell: Arc<SignalCell>, sink: Arc<dyn EventSink>, stop: StopToken, period: Duration) -> Self {
        Self {
            cell,
            sink,
            stop,
            period,
        }
    }

    /// One iteration without the sleep: block until an event arrives and consume it
    pub fn step(&self) -> Consumption {
        self.cell.await_and_consume(self.sink.as_ref())
    }

    /// Run until stopped; returns the number of events processed
    pub fn run(self) -> u64 {
        info!("Consumer started (period {:?})", self.period);
        let mut processed = 0;

        while !self.stop.is_stopped() {
            match self.step() {
                Consumption::Consumed => processed += 1,
                Consumption::Closed => break,
            }
            if self.stop.sleep(self.period) {
                break;
            }
        }

        info!("Consumer stopped after processing {} events", processed);
        processed
    }
}
