use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::MonitorError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timing: TimingConfig,
}

/// Sleep periods of the workers and the main loop, in multiples of one time unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub time_unit_ms: u64,
    pub provider_period_units: u32,
    pub consumer_period_units: u32,
    pub main_tick_units: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            time_unit_ms: 1000,
            provider_period_units: 2,
            consumer_period_units: 1,
            main_tick_units: 1,
        }
    }
}

impl TimingConfig {
    /// Timing with the default periods and a custom time unit
    pub fn with_time_unit(time_unit: Duration) -> Self {
        Self {
            time_unit_ms: time_unit.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    // Saturates instead of panicking; `validate` rejects periods this large.
    fn period(&self, units: u32) -> Duration {
        self.time_unit().checked_mul(units).unwrap_or(Duration::MAX)
    }

    pub fn provider_period(&self) -> Duration {
        self.period(self.provider_period_units)
    }

    pub fn consumer_period(&self) -> Duration {
        self.period(self.consumer_period_units)
    }

    pub fn main_tick(&self) -> Duration {
        self.period(self.main_tick_units)
    }

    /// Reject values that would make a loop spin without sleeping, or
    /// periods too long to add to the current time
    pub fn validate(&self) -> std::result::Result<(), MonitorError> {
        if self.time_unit_ms == 0 {
            return Err(MonitorError::Config("timing.time_unit_ms must be > 0".to_string()));
        }
        let now = Instant::now();
        for (name, units) in [
            ("provider_period_units", self.provider_period_units),
            ("consumer_period_units", self.consumer_period_units),
            ("main_tick_units", self.main_tick_units),
        ] {
            if units == 0 {
                return Err(MonitorError::Config(format!("timing.{} must be > 0", name)));
            }
            let fits = self
                .time_unit()
                .checked_mul(units)
                .and_then(|period| now.checked_add(period))
                .is_some();
            if !fits {
                return Err(MonitorError::Config(format!(
                    "timing.{} x time_unit_ms ({} x {}ms) is out of range",
                    name, units, self.time_unit_ms
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply command-line overrides on top of the loaded file
    pub fn with_time_unit_override(mut self, time_unit_ms: Option<u64>) -> Self {
        if let Some(ms) = time_unit_ms {
            log::info!("Overriding time unit: {}ms", ms);
            self.timing.time_unit_ms = ms;
        }
        self
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.timing.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
