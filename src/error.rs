//! Error types for signal-monitor
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A worker thread could not be started
    #[error("Failed to spawn worker {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
