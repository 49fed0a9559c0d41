//! Logging system setup for the benchmark runner.
//!
//! The bus logs every dispatch at `trace` level. Inside a timed loop that
//! output would dominate the measurement, so the configured level applies to
//! the runner while `ember_bus` itself is capped at `info` unless `RUST_LOG`
//! says otherwise.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ceiling applied to the bus crate's own log output during a run.
const BUS_LOG_CEILING: &str = "ember_bus=info";

/// Builds the filter used when `RUST_LOG` is not set.
///
/// # Arguments
///
/// * `level` - Level for the runner, from the config file or `--log-level`
///
/// # Returns
///
/// An `EnvFilter` at `level` with the bus crate capped at `info`, or a parse
/// error if `level` is not a valid directive.
pub fn bench_filter(level: &str) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
    Ok(EnvFilter::try_new(level)?.add_directive(BUS_LOG_CEILING.parse()?))
}

/// Initializes the logging system for a benchmark run.
///
/// # Arguments
///
/// * `config` - Logging configuration from the config file
/// * `json_format` - Whether to force JSON output format (CLI override)
///
/// # Returns
///
/// `Ok(())` once the global subscriber is installed, or an error if the level
/// is invalid or a subscriber was already installed.
///
/// # Behaviour
///
/// * **`RUST_LOG` wins** - when set, it replaces [`bench_filter`] entirely,
///   including the bus ceiling
/// * **JSON output** - machine-readable reports for collecting results
/// * **Thread information** - scenarios run on the blocking pool, so the
///   thread name shows which worker ran each one
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let log_level = config.level.as_str();
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => bench_filter(log_level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {} ({})", log_level, BUS_LOG_CEILING);
    Ok(())
}
