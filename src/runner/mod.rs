//! Worker loops
//!
//! - Provider: supplies an event whenever the flag is clear
//! - Consumer: waits for an event and consumes it

mod consumer;
mod provider;

pub use consumer::Consumer;
pub use provider::Provider;
