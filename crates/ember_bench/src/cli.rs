//! Command-line interface for the benchmark runner.
//!
//! Every flag is optional and overrides the matching value from the
//! configuration file.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the number of listeners per event
    pub listeners: Option<usize>,
    /// Optional override for the number of operations per scenario
    pub emits: Option<usize>,
    /// Scenarios to run instead of the configured ones
    pub scenarios: Vec<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    ///
    /// Exits with a usage message when a flag has an invalid value.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list, the first item being the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ember-bench.toml")),
            listeners: matches.get_one::<usize>("listeners").copied(),
            emits: matches.get_one::<usize>("emits").copied(),
            scenarios: matches
                .get_many::<String>("scenario")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

fn command() -> Command {
    Command::new("Ember Bus Benchmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Measures registration, emission and removal throughput of ember_bus")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("ember-bench.toml"),
        )
        .arg(
            Arg::new("listeners")
                .short('n')
                .long("listeners")
                .value_name("COUNT")
                .help("Listeners registered per event")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("emits")
                .short('e')
                .long("emits")
                .value_name("COUNT")
                .help("Operations performed per scenario")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("NAME")
                .help("Scenario to run (on, emit, emit-async, remove-all); repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
}
