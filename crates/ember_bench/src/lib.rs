//! # Ember Bench
//!
//! Throughput benchmark for `ember_bus`. Handles CLI parsing, configuration
//! loading and logging setup, then runs the selected scenarios in order.
//!
//! ```bash
//! # Run every scenario with the defaults (creates ember-bench.toml)
//! ember-bench
//!
//! # Ten thousand emits to 32 listeners, JSON output
//! ember-bench --scenario emit --listeners 32 --emits 10000 --json-logs
//! ```

pub mod bench;
pub mod cli;
pub mod config;
pub mod logging;

use anyhow::{anyhow, Context};
use bench::{run_scenario, BenchReport};
use cli::CliArgs;
use config::AppConfig;
use tracing::info;

pub use bench::Scenario;
pub use config::{BenchSettings, LoggingSettings};

/// Parses the command line, loads configuration and runs the benchmark.
pub async fn init() -> anyhow::Result<Vec<BenchReport>> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .map_err(|e| anyhow!("failed to load {}: {e}", args.config_path.display()))?;
    config.apply_cli(&args).map_err(|e| anyhow!(e))?;

    logging::setup_logging(&config.logging, args.json_logs)
        .map_err(|e| anyhow!("failed to set up logging: {e}"))?;

    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;
    info!("✅ Configuration loaded from {}", args.config_path.display());

    run(&config).await
}

/// Runs every configured scenario and logs its report.
pub async fn run(config: &AppConfig) -> anyhow::Result<Vec<BenchReport>> {
    info!(
        "🚀 Ember bench: {} listeners, {} operations, dispatch {}",
        config.bench.listeners, config.bench.emits, config.bus.dispatch
    );

    let mut reports = Vec::with_capacity(config.bench.scenarios.len());
    for &scenario in &config.bench.scenarios {
        let settings = config.bus.clone();
        let listeners = config.bench.listeners;
        let operations = config.bench.emits;

        let report = tokio::task::spawn_blocking(move || {
            run_scenario(scenario, &settings, listeners, operations)
        })
        .await
        .with_context(|| format!("scenario {scenario} did not complete"))?;

        report.log();
        reports.push(report);
    }

    info!("🏁 Finished {} scenarios", reports.len());
    Ok(reports)
}
