//! Session - one full run of the monitor from start to interrupt
//!
//! The interrupt future is polled once before the workers start, so a signal
//! listener such as `tokio::signal::ctrl_c` is registered before any event
//! can be printed. After the interrupt the shutdown notice goes to `out` and
//! both workers are stopped and joined.

use std::future::{Future, poll_fn};
use std::io::{self, Write};
use std::sync::Arc;
use std::task::Poll;

use colored::*;
use log::{info, warn};

use crate::config::TimingConfig;
use crate::daemon::monitor::{Monitor, ShutdownReport};
use crate::daemon::tick::{TickState, run_until_interrupted};
use crate::error::Result;
use crate::events::EventSink;

pub const SHUTDOWN_NOTICE: &str = "\nShutting down...";

/// What a finished session did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub ticks: TickState,
    pub report: ShutdownReport,
}

/// Start the workers, tick until `interrupt` resolves, then shut down.
///
/// If `interrupt` fails on its first poll the workers are never started.
pub async fn run_session<F, W>(
    timing: &TimingConfig,
    sink: Arc<dyn EventSink>,
    interrupt: F,
    out: &mut W,
) -> Result<SessionSummary>
where
    F: Future<Output = io::Result<()>>,
    W: Write,
{
    tokio::pin!(interrupt);
    let early = poll_fn(|cx| Poll::Ready(interrupt.as_mut().poll(cx))).await;
    if let Poll::Ready(Err(e)) = early {
        return Err(e.into());
    }

    let monitor = Monitor::start(timing, sink)?;
    let waited = match early {
        Poll::Ready(_) => {
            let mut state = TickState::new();
            state.request_shutdown();
            info!("Interrupt received before the first tick");
            Ok(state)
        }
        Poll::Pending => run_until_interrupted(timing.main_tick(), interrupt.as_mut()).await,
    };

    let notice = writeln!(out, "{}", SHUTDOWN_NOTICE.yellow()).and_then(|()| out.flush());
    let report = monitor.shutdown();
    if !report.is_clean() {
        warn!("Unclean worker exit: {:?}", report);
    }

    notice?;
    Ok(SessionSummary { ticks: waited?, report })
}
