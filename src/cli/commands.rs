//! CLI definition using clap.
//!
//! All flags are optional; with none the monitor runs with a one second
//! time unit and the config file fallback chain.

use clap::Parser;
use std::path::PathBuf;

/// signal-monitor - provider/consumer coordination demo
#[derive(Parser, Debug)]
#[command(name = "signal-monitor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Length of one time unit in milliseconds (overrides the config file)
    #[arg(short = 'u', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub time_unit_ms: Option<u64>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}
