//! Benchmark scenarios.
//!
//! Each scenario builds its own bus, performs the configured number of operations and reports
//! how long they took. Scenarios are synchronous; the runner moves them onto
//! the blocking pool so the async runtime stays responsive.

use ember_bus::{run_microtasks, BusSettings, DispatchMode, EventBus, Handler};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const EVENT: &str = "test";
const REMOVE_ALL_EVENTS: [&str; 4] = ["test", "test:a", "test:b", "test:c"];
const DRAIN_EVERY: usize = 1024;

/// A benchmark workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Register one handler per operation
    On,
    /// Emission to a fixed set of listeners using the bus's configured
    /// dispatch mode
    Emit,
    /// Deferred emission, draining the microtask queue as it goes
    EmitAsync,
    /// Register listeners on several events, then remove them all
    RemoveAll,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::On,
        Scenario::Emit,
        Scenario::EmitAsync,
        Scenario::RemoveAll,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::On => "on",
            Scenario::Emit => "emit",
            Scenario::EmitAsync => "emit-async",
            Scenario::RemoveAll => "remove-all",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s.trim())
            .ok_or_else(|| {
                format!(
                    "Unknown scenario: {}. Must be one of: {:?}",
                    s,
                    Scenario::ALL.map(|scenario| scenario.name())
                )
            })
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub scenario: Scenario,
    /// Operations performed
    pub operations: usize,
    /// Handler invocations observed
    pub deliveries: u64,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl BenchReport {
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return f64::INFINITY;
        }
        self.operations as f64 / secs
    }

    /// Writes the report to the log.
    pub fn log(&self) {
        info!(
            "⏱️ {:<10} {:>10} ops in {:>10.3?} ({:.0} ops/sec, {} deliveries)",
            self.scenario.name(),
            self.operations,
            self.elapsed,
            self.ops_per_sec(),
            self.deliveries
        );
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_micros() as f64 / 1000.0)
    }
}

/// Runs `scenario` with `listeners` handlers per event and `operations`
/// iterations on a bus built from `settings`.
pub fn run_scenario(
    scenario: Scenario,
    settings: &BusSettings,
    listeners: usize,
    operations: usize,
) -> BenchReport {
    debug!(
        "Running {} with {} listeners and {} operations",
        scenario, listeners, operations
    );
    let deliveries = Arc::new(AtomicU64::new(0));
    let counter = deliveries.clone();
    let handler = Handler::new(move |args: &[Value]| {
        black_box(args);
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let bus = EventBus::with_settings(settings.clone());
    let start = Instant::now();
    match scenario {
        Scenario::On => {
            for _ in 0..operations {
                bus.on(EVENT, handler.clone());
            }
        }
        Scenario::Emit => {
            register(&bus, EVENT, &handler, listeners);
            let args = [json!(1)];
            let deferred = bus.dispatch_mode() == DispatchMode::Deferred;
            for i in 0..operations {
                bus.emit(EVENT, &args);
                if deferred && (i + 1) % DRAIN_EVERY == 0 {
                    run_microtasks();
                }
            }
            if deferred {
                run_microtasks();
            }
        }
        Scenario::EmitAsync => {
            register(&bus, EVENT, &handler, listeners);
            let args = [json!(1)];
            for i in 0..operations {
                bus.emit_async(EVENT, &args);
                if (i + 1) % DRAIN_EVERY == 0 {
                    run_microtasks();
                }
            }
            run_microtasks();
        }
        Scenario::RemoveAll => {
            for _ in 0..operations {
                for event in REMOVE_ALL_EVENTS {
                    register(&bus, event, &handler, listeners);
                }
                bus.remove_all_listeners(None);
            }
        }
    }
    let elapsed = start.elapsed();
    bus.destroy();

    BenchReport {
        scenario,
        operations,
        deliveries: deliveries.load(Ordering::Relaxed),
        elapsed,
    }
}

fn register(bus: &EventBus, event: &str, handler: &Handler, listeners: usize) {
    for _ in 0..listeners {
        bus.on(event, handler.clone());
    }
}
