//! Bus settings.
//!
//! Settings are plain serde structs so hosts can embed them in their own
//! configuration files (see the `ember_bench` crate for a TOML example).

use crate::error::BusError;
use serde::{Deserialize, Serialize};

/// Prefix used for the synthetic events emitted by reactive wrappers.
pub const DEFAULT_OBSERVE_PREFIX: &str = "observe:";

fn default_observe_prefix() -> String {
    DEFAULT_OBSERVE_PREFIX.to_string()
}

/// Delivery mode used by [`EventBus::emit`](crate::EventBus::emit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Handlers run on the caller's stack before `emit` returns
    #[default]
    Immediate,
    /// Handlers run later, from the bus scheduler
    Deferred,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::Immediate => f.write_str("immediate"),
            DispatchMode::Deferred => f.write_str("deferred"),
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" | "sync" => Ok(DispatchMode::Immediate),
            "deferred" | "async" => Ok(DispatchMode::Deferred),
            other => Err(BusError::InvalidConfig(format!(
                "unknown dispatch mode '{}'",
                other
            ))),
        }
    }
}

/// Construction-time settings for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSettings {
    /// Default delivery mode for `emit`
    #[serde(default)]
    pub dispatch: DispatchMode,
    /// Prefix of the events emitted by reactive wrappers
    #[serde(default = "default_observe_prefix")]
    pub observe_prefix: String,
    /// Log a trace line when an event is emitted with no handlers
    #[serde(default)]
    pub trace_unhandled: bool,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Immediate,
            observe_prefix: default_observe_prefix(),
            trace_unhandled: false,
        }
    }
}

impl BusSettings {
    /// Settings for a bus whose `emit` defers delivery.
    pub fn deferred() -> Self {
        Self {
            dispatch: DispatchMode::Deferred,
            ..Self::default()
        }
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.observe_prefix.is_empty() {
            return Err(BusError::InvalidConfig(
                "observe_prefix cannot be empty".to_string(),
            ));
        }
        if self.observe_prefix.chars().any(char::is_whitespace) {
            return Err(BusError::InvalidConfig(format!(
                "observe_prefix '{}' cannot contain whitespace",
                self.observe_prefix
            )));
        }
        Ok(())
    }
}
