//! Signal cell: a readiness flag behind a mutex and a condition variable
//!
//! The provider sets the flag and wakes waiters; the consumer waits for the
//! flag, clears it and carries on. Every read and write of the flag happens
//! through a [`CellGuard`], which holds the lock for as long as it lives.
//!
//! The flag is a pair of plain booleans, so a poisoned lock never leaves it
//! half-written. A panic in one worker therefore does not take the other one
//! down: poisoning is logged and the lock is reclaimed.

use std::sync::atomic::Ordering::{Relaxed, SeqCst};
use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use crate::events::{Event, EventSink};

#[derive(Debug, Default)]
struct CellState {
    ready: bool,
    closed: bool,
}

/// Result of [`SignalCell::await_and_consume`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// The flag was set and has been cleared
    Consumed,
    /// The cell was closed while waiting
    Closed,
}

/// Shared readiness flag coordinating one provider and one consumer
#[derive(Debug, Default)]
pub struct SignalCell {
    state: Mutex<CellState>,
    ready_changed: Condvar,
    stats: CellStats,
}

impl SignalCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the cell. The lock is released when the guard drops.
    pub fn acquire(&self) -> CellGuard<'_> {
        let state = self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Signal cell lock poisoned, reclaiming it");
            PoisonError::into_inner(poisoned)
        });
        CellGuard {
            hold: self.stats.enter(),
            state,
            cell: self,
        }
    }

    /// Set the flag if it is clear, emitting [`Event::Supplied`] and waking
    /// all waiters. Returns false without emitting or notifying when the flag
    /// is already set or the cell is closed.
    ///
    /// The event is emitted before the flag changes, so a panicking sink
    /// leaves the flag clear.
    pub fn signal(&self, sink: &dyn EventSink) -> bool {
        let mut guard = self.acquire();
        if guard.is_ready() || guard.is_closed() {
            return false;
        }
        sink.emit(Event::Supplied);
        guard.set_ready(true);
        guard.notify_all();
        true
    }

    /// Block until the flag is set, then clear it and emit [`Event::Processed`].
    ///
    /// Emits [`Event::Waiting`] every time the flag is found clear, including
    /// after spurious wakeups. Returns [`Consumption::Closed`] if the cell is
    /// closed while the flag is clear.
    pub fn await_and_consume(&self, sink: &dyn EventSink) -> Consumption {
        let mut guard = self.acquire();
        while !guard.is_ready() {
            if guard.is_closed() {
                return Consumption::Closed;
            }
            sink.emit(Event::Waiting);
            guard = guard.wait();
        }
        sink.emit(Event::Processed);
        guard.set_ready(false);
        Consumption::Consumed
    }

    /// Mark the cell closed and wake every waiter
    pub fn close(&self) {
        let mut guard = self.acquire();
        guard.state.closed = true;
        guard.notify_all();
        log::debug!("Signal cell closed");
    }

    /// Whether some thread holds the lock right now
    pub fn is_locked(&self) -> bool {
        matches!(self.state.try_lock(), Err(TryLockError::WouldBlock))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

/// Scoped lock on a [`SignalCell`]
///
/// `wait` and `notify_all` are only reachable through a guard, so both can
/// only be called with the lock held.
pub struct CellGuard<'a> {
    // Declared before `state` so the hold ends before the mutex unlocks.
    hold: Hold<'a>,
    state: MutexGuard<'a, CellState>,
    cell: &'a SignalCell,
}

impl<'a> CellGuard<'a> {
    pub fn is_ready(&self) -> bool {
        self.state.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.state.ready = ready;
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed
    }

    /// Release the lock, sleep until notified, and lock again.
    ///
    /// May return spuriously; callers re-check their condition in a loop.
    pub fn wait(self) -> CellGuard<'a> {
        let CellGuard { hold, state, cell } = self;
        drop(hold);
        let state = cell.ready_changed.wait(state).unwrap_or_else(|poisoned| {
            log::warn!("Signal cell lock poisoned during wait, reclaiming it");
            PoisonError::into_inner(poisoned)
        });
        CellGuard {
            hold: cell.stats.enter(),
            state,
            cell,
        }
    }

    /// Wake every thread blocked in [`CellGuard::wait`]. Keeps the lock.
    pub fn notify_all(&self) {
        self.cell.stats.notifications.fetch_add(1, Relaxed);
        self.cell.ready_changed.notify_all();
    }
}

/// Lock instrumentation
#[derive(Debug, Default)]
struct CellStats {
    acquisitions: AtomicU64,
    holders: AtomicUsize,
    overlaps: AtomicU64,
    notifications: AtomicU64,
    longest_hold_ns: AtomicU64,
}

impl CellStats {
    fn enter(&self) -> Hold<'_> {
        self.acquisitions.fetch_add(1, Relaxed);
        if self.holders.fetch_add(1, SeqCst) > 0 {
            self.overlaps.fetch_add(1, SeqCst);
        }
        Hold {
            stats: self,
            since: Instant::now(),
        }
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            acquisitions: self.acquisitions.load(Relaxed),
            overlaps: self.overlaps.load(SeqCst),
            notifications: self.notifications.load(Relaxed),
            longest_hold: Duration::from_nanos(self.longest_hold_ns.load(Relaxed)),
        }
    }
}

struct Hold<'a> {
    stats: &'a CellStats,
    since: Instant,
}

impl Drop for Hold<'_> {
    fn drop(&mut self) {
        let held = self.since.elapsed().as_nanos().min(u64::MAX as u128) as u64;
        self.stats.longest_hold_ns.fetch_max(held, Relaxed);
        self.stats.holders.fetch_sub(1, SeqCst);
    }
}

/// Point-in-time copy of the cell's lock counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Times the lock was taken, including re-locks after `wait`
    pub acquisitions: u64,
    /// Times a holder found another holder already inside; always 0
    pub overlaps: u64,
    /// Calls to `notify_all`
    pub notifications: u64,
    /// Longest single stretch the lock was held
    pub longest_hold: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    struct PanickingSink;

    impl EventSink for PanickingSink {
        fn emit(&self, _event: Event) {
            panic!("sink failure");
        }
    }

    fn wait_for_event(sink: &RecordingSink, event: Event) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.count(event) == 0 {
            assert!(Instant::now() < deadline, "timed out waiting for {:?}", event);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_new_cell_is_clear_and_unlocked() {
        let cell = SignalCell::new();
        assert!(!cell.is_locked());

        let guard = cell.acquire();
        assert!(!guard.is_ready());
        assert!(!guard.is_closed());
    }

    #[test]
    fn test_guard_holds_lock_until_dropped() {
        let cell = SignalCell::new();
        {
            let _guard = cell.acquire();
            assert!(cell.is_locked());
        }
        assert!(!cell.is_locked());
        assert_eq!(cell.stats().acquisitions, 1);
    }

    #[test]
    fn test_signal_sets_flag_and_notifies() {
        let cell = SignalCell::new();
        let sink = RecordingSink::new();

        assert!(cell.signal(&sink));
        assert!(cell.acquire().is_ready());
        assert_eq!(sink.events(), vec![Event::Supplied]);
        assert_eq!(cell.stats().notifications, 1);
    }

    #[test]
    fn test_signal_skips_when_already_ready() {
        let cell = SignalCell::new();
        let sink = RecordingSink::new();

        assert!(cell.signal(&sink));
        assert!(!cell.signal(&sink));
        assert!(!cell.signal(&sink));

        assert_eq!(sink.count(Event::Supplied), 1);
        assert_eq!(cell.stats().notifications, 1);
    }

    #[test]
    fn test_consume_when_ready_does_not_wait() {
        let cell = SignalCell::new();
        let sink = RecordingSink::new();
        cell.signal(&sink);

        assert_eq!(cell.await_and_consume(&sink), Consumption::Consumed);
        assert!(!cell.acquire().is_ready());
        assert_eq!(sink.events(), vec![Event::Supplied, Event::Processed]);
    }

    #[test]
    fn test_waiter_wakes_on_signal() {
        let cell = Arc::new(SignalCell::new());
        let sink = Arc::new(RecordingSink::new());
        let (done_tx, done_rx) = mpsc::channel();

        let consumer = {
            let cell = Arc::clone(&cell);
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                let outcome = cell.await_and_consume(sink.as_ref());
                done_tx.send(outcome).unwrap();
            })
        };

        // The consumer is inside wait() once it has logged Waiting and let go of the lock
        wait_for_event(&sink, Event::Waiting);
        drop(cell.acquire());

        assert!(cell.signal(sink.as_ref()));
        let outcome = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        consumer.join().unwrap();

        assert_eq!(outcome, Consumption::Consumed);
        assert!(!cell.acquire().is_ready());
        assert_eq!(
            sink.events().last().copied(),
            Some(Event::Processed),
            "processed must follow supplied"
        );
    }

    #[test]
    fn test_close_wakes_waiter() {
        let cell = Arc::new(SignalCell::new());
        let sink = Arc::new(RecordingSink::new());
        let (done_tx, done_rx) = mpsc::channel();

        let consumer = {
            let cell = Arc::clone(&cell);
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                done_tx.send(cell.await_and_consume(sink.as_ref())).unwrap();
            })
        };

        wait_for_event(&sink, Event::Waiting);
        cell.close();

        let outcome = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        consumer.join().unwrap();
        assert_eq!(outcome, Consumption::Closed);
        assert_eq!(sink.count(Event::Processed), 0);
    }

    #[test]
    fn test_failed_supply_leaves_flag_clear() {
        let cell = SignalCell::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| cell.signal(&PanickingSink)));
        assert!(result.is_err());

        assert!(!cell.acquire().is_ready());
        assert_eq!(cell.stats().notifications, 0);
    }

    #[test]
    fn test_failed_processing_leaves_flag_set() {
        let cell = SignalCell::new();
        let sink = RecordingSink::new();
        cell.signal(&sink);

        let result = panic::catch_unwind(AssertUnwindSafe(|| cell.await_and_consume(&PanickingSink)));
        assert!(result.is_err());

        // The event is still pending for the next consumer
        assert!(cell.acquire().is_ready());
        assert_eq!(cell.await_and_consume(&sink), Consumption::Consumed);
    }

    #[test]
    fn test_closed_cell_rejects_signal() {
        let cell = SignalCell::new();
        let sink = RecordingSink::new();
        cell.close();

        assert!(!cell.signal(&sink));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_ready_flag_is_consumed_before_close_is_seen() {
        let cell = SignalCell::new();
        let sink = RecordingSink::new();
        cell.signal(&sink);
        cell.close();

        assert_eq!(cell.await_and_consume(&sink), Consumption::Consumed);
        assert_eq!(cell.await_and_consume(&sink), Consumption::Closed);
    }

    #[test]
    fn test_poisoned_lock_is_reclaimed() {
        let cell = Arc::new(SignalCell::new());
        let clone = Arc::clone(&cell);
        let result = thread::spawn(move || {
            let mut guard = clone.acquire();
            guard.set_ready(true);
            panic!("worker fault while holding the lock");
        })
        .join();
        assert!(result.is_err());

        assert!(!cell.is_locked());
        let sink = RecordingSink::new();
        assert_eq!(cell.await_and_consume(&sink), Consumption::Consumed);
    }

    #[test]
    fn test_concurrent_holders_never_overlap() {
        let cell = Arc::new(SignalCell::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        let mut guard = cell.acquire();
                        let ready = guard.is_ready();
                        guard.set_ready(!ready);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cell.stats();
        assert_eq!(stats.acquisitions, 4_000);
        assert_eq!(stats.overlaps, 0);
    }
}
