//! Configuration management for the benchmark runner.
//!
//! Configuration is read from a TOML file and then overridden by
//! command-line flags.

use crate::bench::Scenario;
use crate::cli::CliArgs;
use ember_bus::BusSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_listeners() -> usize {
    10
}

fn default_emits() -> usize {
    1_000_000
}

fn default_scenarios() -> Vec<Scenario> {
    Scenario::ALL.to_vec()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Settings for every bus the benchmark creates
    #[serde(default)]
    pub bus: BusSettings,
    /// Workload settings
    #[serde(default)]
    pub bench: BenchSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Workload size and scenario selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchSettings {
    /// Listeners registered per event
    #[serde(default = "default_listeners")]
    pub listeners: usize,
    /// Operations performed per scenario
    #[serde(default = "default_emits")]
    pub emits: usize,
    /// Scenarios to run, in order
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<Scenario>,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            listeners: default_listeners(),
            emits: default_emits(),
            scenarios: default_scenarios(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(
        path: &PathBuf,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the loaded values.
    pub fn apply_cli(&mut self, args: &CliArgs) -> Result<(), String> {
        if let Some(listeners) = args.listeners {
            self.bench.listeners = listeners;
        }
        if let Some(emits) = args.emits {
            self.bench.emits = emits;
        }
        if !args.scenarios.is_empty() {
            self.bench.scenarios = args
                .scenarios
                .iter()
                .map(|name| name.parse::<Scenario>())
                .collect::<Result<_, _>>()?;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        Ok(())
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        self.bus.validate().map_err(|e| e.to_string())?;

        if self.bench.listeners == 0 {
            return Err("bench.listeners must be greater than 0".to_string());
        }
        if self.bench.emits == 0 {
            return Err("bench.emits must be greater than 0".to_string());
        }
        if self.bench.scenarios.is_empty() {
            return Err("bench.scenarios cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }
        Ok(())
    }
}
