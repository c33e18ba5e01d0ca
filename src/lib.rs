//! signal-monitor - provider/consumer coordination over a condition variable
//!
//! A provider thread raises a readiness flag and wakes the consumer; the
//! consumer waits for the flag, clears it, and waits again. The main flow
//! ticks until interrupted, then stops and joins both threads.

pub mod config;
pub mod coordination;
pub mod daemon;
pub mod error;
pub mod events;
pub mod runner;

pub use error::{MonitorError, Result};
