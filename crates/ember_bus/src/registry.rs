//! Process-wide bus registry and the shared default bus.
//!
//! Both are created on first use and live for the rest of the process.
//! Entries stay registered until [`unregister_instance`] removes them;
//! [`ProviderScope::enter_with_id`](crate::context::ProviderScope::enter_with_id)
//! does that automatically when its scope ends.

use crate::bus::EventBus;
use crate::error::BusError;
use compact_str::CompactString;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

static INSTANCES: Lazy<DashMap<CompactString, EventBus>> = Lazy::new(DashMap::new);

static DEFAULT_BUS: Lazy<EventBus> = Lazy::new(|| {
    debug!("Creating default event bus");
    EventBus::new()
});

/// The shared bus used when nothing more specific is available.
pub fn default_bus() -> EventBus {
    DEFAULT_BUS.clone()
}

/// Registers `bus` under `id`, returning the bus it replaced, if any.
pub fn register_instance(id: &str, bus: EventBus) -> Result<Option<EventBus>, BusError> {
    if id.trim().is_empty() {
        return Err(BusError::InvalidInstanceId(id.to_string()));
    }
    let previous = INSTANCES.insert(CompactString::new(id), bus);
    if previous.is_some() {
        warn!("⚠️ Replaced event bus registered under '{}'", id);
    } else {
        debug!("Registered event bus '{}'", id);
    }
    Ok(previous)
}

/// Looks up the bus registered under `id`.
pub fn instance(id: &str) -> Option<EventBus> {
    INSTANCES.get(id).map(|entry| entry.value().clone())
}

/// Looks up the bus registered under `id`, failing if there is none.
pub fn require_instance(id: &str) -> Result<EventBus, BusError> {
    instance(id).ok_or_else(|| BusError::InstanceNotFound(id.to_string()))
}

/// Removes the bus registered under `id`.
pub fn unregister_instance(id: &str) -> Option<EventBus> {
    let removed = INSTANCES.remove(id).map(|(_, bus)| bus);
    if removed.is_some() {
        debug!("Unregistered event bus '{}'", id);
    }
    removed
}

/// Removes `id` only if it still maps to `bus`.
pub(crate) fn unregister_if_same(id: &str, bus: &EventBus) -> bool {
    INSTANCES.remove_if(id, |_, registered| registered.ptr_eq(bus)).is_some()
}

/// Identifiers currently registered, in no particular order.
pub fn registered_ids() -> Vec<String> {
    INSTANCES.iter().map(|entry| entry.key().to_string()).collect()
}
