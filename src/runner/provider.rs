//! Provider loop
//!
//! Sets the readiness flag whenever it is clear, then sleeps with the lock
//! released. Runs until the stop token fires.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::coordination::{SignalCell, StopToken};
use crate::events::EventSink;

pub struct Provider {
    cell: Arc<SignalCell>,
    sink: Arc<dyn EventSink>,
    stop: StopToken,
    period: Duration,
}

impl Provider {
    pub fn new(cell: Arc<SignalCell>, sink: Arc<dyn EventSink>, stop: StopToken, period: Duration) -> Self {
        Self {
            cell,
            sink,
            stop,
            period,
        }
    }

    /// One iteration without the sleep. Returns true if an event was supplied.
    pub fn step(&self) -> bool {
        self.cell.signal(self.sink.as_ref())
    }

    /// Run until stopped; returns the number of events supplied
    pub fn run(self) -> u64 {
        info!("Provider started (period {:?})", self.period);
        let mut supplied = 0;

        while !self.stop.is_stopped() {
            if self.step() {
                supplied += 1;
            } else {
                debug!("Provider: flag still set, skipping");
            }
            if self.stop.sleep(self.period) {
                break;
            }
        }

        info!("Provider stopped after supplying {} events", supplied);
        supplied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, RecordingSink};
    use std::thread;

    fn provider(period: Duration) -> (Provider, Arc<SignalCell>, Arc<RecordingSink>, StopToken) {
        let cell = Arc::new(SignalCell::new());
        let sink = Arc::new(RecordingSink::new());
        let stop = StopToken::new();
        let provider = Provider::new(Arc::clone(&cell), sink.clone(), stop.clone(), period);
        (provider, cell, sink, stop)
    }

    #[test]
    fn test_step_supplies_once() {
        let (provider, cell, sink, _stop) = provider(Duration::from_millis(10));

        assert!(provider.step());
        assert!(!provider.step());
        assert!(cell.acquire().is_ready());
        assert_eq!(sink.events(), vec![Event::Supplied]);
    }

    #[test]
    fn test_run_exits_when_already_stopped() {
        let (provider, _cell, sink, stop) = provider(Duration::from_secs(10));
        stop.stop();

        assert_eq!(provider.run(), 0);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_run_without_consumer_supplies_only_once() {
        let (provider, cell, sink, stop) = provider(Duration::from_millis(5));
        let handle = thread::spawn(move || provider.run());

        thread::sleep(Duration::from_millis(60));
        stop.stop();

        assert_eq!(handle.join().unwrap(), 1);
        assert_eq!(sink.count(Event::Supplied), 1);
        assert_eq!(cell.stats().notifications, 1);
    }

    #[test]
    fn test_lock_is_free_while_provider_sleeps() {
        let (provider, cell, _sink, stop) = provider(Duration::from_secs(30));
        let handle = thread::spawn(move || provider.run());

        // Wait for the first iteration, then the provider is parked in its sleep
        while cell.stats().notifications == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));
        assert!(!cell.is_locked());

        stop.stop();
        assert_eq!(handle.join().unwrap(), 1);
    }
}
