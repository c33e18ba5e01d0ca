//! Monitor - owns the provider and consumer threads
//!
//! Starting the monitor spawns both workers on named threads. Shutting it
//! down fires the stop token, closes the signal cell so a blocked consumer
//! returns, and joins both threads. A worker that panicked is reported, not
//! propagated: the other worker keeps running until shutdown.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::config::TimingConfig;
use crate::coordination::{SignalCell, StopToken};
use crate::error::{MonitorError, Result};
use crate::events::EventSink;
use crate::runner::{Consumer, Provider};

/// How a worker thread ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Loop returned normally with this many events handled
    Finished(u64),
    /// Loop panicked
    Panicked(String),
}

impl WorkerOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, WorkerOutcome::Finished(_))
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerOutcome::Finished(count) => write!(f, "finished ({} events)", count),
            WorkerOutcome::Panicked(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

/// Outcome of both workers after shutdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub provider: WorkerOutcome,
    pub consumer: WorkerOutcome,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.provider.is_finished() && self.consumer.is_finished()
    }
}

pub struct Monitor {
    cell: Arc<SignalCell>,
    stop: StopToken,
    provider: JoinHandle<u64>,
    consumer: JoinHandle<u64>,
}

impl Monitor {
    /// Spawn the provider, then the consumer
    pub fn start(timing: &TimingConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        timing.validate()?;

        let cell = Arc::new(SignalCell::new());
        let stop = StopToken::new();

        let provider = Provider::new(Arc::clone(&cell), Arc::clone(&sink), stop.clone(), timing.provider_period());
        let provider = spawn_worker("provider", move || provider.run())?;

        let consumer = Consumer::new(Arc::clone(&cell), sink, stop.clone(), timing.consumer_period());
        let consumer = match spawn_worker("consumer", move || consumer.run()) {
            Ok(handle) => handle,
            Err(e) => {
                stop.stop();
                cell.close();
                let _ = provider.join();
                return Err(e);
            }
        };

        info!("Monitor started");
        Ok(Self {
            cell,
            stop,
            provider,
            consumer,
        })
    }

    pub fn cell(&self) -> &Arc<SignalCell> {
        &self.cell
    }

    /// Whether a worker thread has already exited (normally or by panic)
    pub fn any_worker_finished(&self) -> bool {
        self.provider.is_finished() || self.consumer.is_finished()
    }

    /// Stop both workers and wait for them to exit
    pub fn shutdown(self) -> ShutdownReport {
        info!("Stopping workers");
        self.stop.stop();
        self.cell.close();

        let report = ShutdownReport {
            provider: join_worker("provider", self.provider),
            consumer: join_worker("consumer", self.consumer),
        };
        info!("Workers stopped: provider {}, consumer {}", report.provider, report.consumer);
        report
    }
}

fn spawn_worker<F>(name: &str, body: F) -> Result<JoinHandle<u64>>
where
    F: FnOnce() -> u64 + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|source| MonitorError::WorkerSpawn {
            name: name.to_string(),
            source,
        })
}

fn join_worker(name: &str, handle: JoinHandle<u64>) -> WorkerOutcome {
    match handle.join() {
        Ok(count) => WorkerOutcome::Finished(count),
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!("Worker {} panicked: {}", name, msg);
            WorkerOutcome::Panicked(msg)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
