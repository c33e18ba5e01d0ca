use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use signal_monitor::config::Config;
use signal_monitor::daemon::run_session;
use signal_monitor::events::ConsoleSink;

mod cli;

use cli::Cli;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("signal-monitor")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("signal-monitor.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application with timing {:?}", config.timing);

    if cli.is_verbose() {
        println!(
            "{}",
            format!(
                "Time unit {}ms, provider every {} units, consumer every {} units",
                config.timing.time_unit_ms, config.timing.provider_period_units, config.timing.consumer_period_units
            )
            .yellow()
        );
    }

    // Runtime and Ctrl-C listener come up before the workers start
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let summary = runtime
        .block_on(run_session(
            &config.timing,
            Arc::new(ConsoleSink),
            tokio::signal::ctrl_c(),
            &mut io::stdout(),
        ))
        .context("Monitor session failed")?;

    info!("Main loop ran {} ticks", summary.ticks.tick_count);
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref())
        .context("Failed to load configuration")?
        .with_time_unit_override(cli.time_unit_ms);

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
