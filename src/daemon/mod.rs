//! Daemon Core - worker lifecycle and the main tick loop
//!
//! - Starts the provider and consumer on background threads
//! - Ticks the main flow until interrupted
//! - Stops and joins the workers on shutdown

pub mod monitor;
pub mod session;
pub mod tick;

pub use monitor::*;
pub use session::*;
pub use tick::*;
