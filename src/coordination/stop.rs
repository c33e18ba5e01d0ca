//! Stop token shared by the workers
//!
//! A latch that can be fired once. Workers sleep on it instead of calling
//! `thread::sleep`, so firing the token cuts every pending sleep short.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Latch {
    stopped: Mutex<bool>,
    fired: Condvar,
}

/// Cloneable handle to a shared stop latch
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    latch: Arc<Latch>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the latch and wake every sleeper
    pub fn stop(&self) {
        let mut stopped = self.latch.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.latch.fired.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.latch.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `period` or until the token fires, whichever comes first.
    ///
    /// Returns true if the token has fired.
    pub fn sleep(&self, period: Duration) -> bool {
        let stopped = self.latch.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _timeout) = self
            .latch
            .fired
            .wait_timeout_while(stopped, period, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}
