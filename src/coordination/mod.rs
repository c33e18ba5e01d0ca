//! Coordination primitives
//!
//! The signal cell carries the readiness flag between provider and consumer;
//! the stop token ends both workers and cuts their sleeps short.

pub mod cell;
pub mod stop;

pub use cell::*;
pub use stop::*;
