//! # Ember Bus
//!
//! A lightweight in-process publish/subscribe event bus.
//!
//! Handlers are registered per event name and called in registration order.
//! Events can be delivered immediately on the caller's stack or deferred to a
//! [`Scheduler`], in which case the set of handlers is captured at the moment
//! of the call. On top of the bus sits reactive observation of JSON objects
//! ([`EventBus::observe`]), a process-wide registry of named buses, and the
//! provider and subscription helpers used by hosts to hand buses around.
//!
//! ## Quick start
//!
//! ```rust
//! use ember_bus::{run_microtasks, EventBus, Handler};
//! use serde_json::{json, Value};
//!
//! let bus = EventBus::new();
//! let greet = Handler::new(|args: &[Value]| println!("hello {}", args[0]));
//!
//! bus.on("greet", greet.clone());
//! bus.emit("greet", &[json!("world")]);
//!
//! bus.emit_async("greet", &[json!("later")]);
//! run_microtasks();
//!
//! bus.off("greet", Some(&greet));
//! assert!(!bus.has_listeners("greet"));
//! ```

pub mod bus;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod reactive;
pub mod registry;
pub mod scheduler;

pub use bus::{BusStats, EventBus};
pub use config::{BusSettings, DispatchMode, DEFAULT_OBSERVE_PREFIX};
pub use context::{current_provider, ProviderScope, Subscription, SubscriptionOptions};
pub use error::{validate_event_name, BusError};
pub use handler::{EventHandler, Handler};
pub use reactive::{ChangeCallback, Field, PropertyChange, Reactive};
pub use registry::{
    default_bus, instance, register_instance, registered_ids, require_instance,
    unregister_instance,
};
pub use scheduler::{
    pending_microtasks, queue_microtask, run_microtasks, Microtasks, Scheduler, Task,
    TokioScheduler,
};
