//! CLI module for signal-monitor - command-line flags.

pub mod commands;

pub use commands::Cli;
