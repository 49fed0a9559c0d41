/// Bulk removal, lifecycle and introspection
use super::core::EventBus;
use super::stats::{BusStats, StatsCounters};
use crate::handler::Handler;
use std::sync::atomic::Ordering;
use tracing::debug;

impl EventBus {
    /// Removes the handlers of `event`, or of every event when `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        match event {
            Some(event) => self.off(event, None),
            None => self.clear_all(),
        }
    }

    /// Clears every handler and makes all further emissions no-ops.
    ///
    /// Deferred batches scheduled earlier still run but deliver nothing.
    /// Later registrations are dropped. Calling it twice is harmless.
    pub fn destroy(&self) {
        let first = !self.inner.destroyed.swap(true, Ordering::AcqRel);
        self.clear_all();
        if first {
            debug!("🗑️ Event bus destroyed");
        }
    }

    fn clear_all(&self) {
        let removed: usize = self.inner.handlers.iter().map(|entry| entry.value().len()).sum();
        self.inner.handlers.clear();
        if removed > 0 {
            StatsCounters::bump(&self.inner.stats.handlers_removed, removed as u64);
            debug!("Removed {} handlers from all events", removed);
        }
    }

    /// Number of handlers registered for `event`.
    #[inline]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.handlers.get(event).map(|entry| entry.value().len()).unwrap_or(0)
    }

    /// Returns true if at least one handler is registered for `event`.
    #[inline]
    pub fn has_listeners(&self, event: &str) -> bool {
        self.inner.handlers.contains_key(event)
    }

    /// Handlers registered for `event`, in delivery order.
    pub fn listeners(&self, event: &str) -> Vec<Handler> {
        self.inner
            .handlers
            .get(event)
            .map(|entry| entry.value().as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Names of all events with at least one handler, in no particular order.
    pub fn event_names(&self) -> Vec<String> {
        self.inner.handlers.iter().map(|entry| entry.key().to_string()).collect()
    }

    /// Copy of the bus counters.
    pub fn stats(&self) -> BusStats {
        self.inner.stats.snapshot()
    }
}
