//! Tick Loop - main flow while the workers run
//!
//! The main flow does no work of its own: it ticks once per interval until
//! the interrupt future resolves.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::Result;

/// Tick state tracks what happened in the main flow
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickState {
    /// Number of ticks since start
    pub tick_count: u64,
    /// Whether shutdown has been requested
    pub shutdown_requested: bool,
}

impl TickState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new tick
    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    /// Request shutdown
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }
}

/// Tick every `interval` until `interrupt` resolves.
///
/// An error from `interrupt` (e.g. the signal handler could not be
/// installed) is returned as is.
pub async fn run_until_interrupted<F>(interval: Duration, interrupt: F) -> Result<TickState>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(interrupt);

    let mut state = TickState::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state.tick();
                log::trace!("Tick {}", state.tick_count);
            }
            result = &mut interrupt => {
                result?;
                state.request_shutdown();
                log::info!("Interrupt received after {} ticks", state.tick_count);
                return Ok(state);
            }
        }
    }
}
