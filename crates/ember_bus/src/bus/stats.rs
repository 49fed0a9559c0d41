/// Statistics tracking for the event bus
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a bus's counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Immediate emissions that found at least one handler
    pub immediate_emits: u64,
    /// Deferred batches handed to the scheduler
    pub deferred_scheduled: u64,
    /// Deferred batches that delivered to their snapshot
    pub deferred_delivered: u64,
    /// Total handlers ever registered (including `once` wrappers)
    pub handlers_registered: u64,
    /// Total handlers removed by `off`, `remove_all_listeners` or `destroy`
    pub handlers_removed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) immediate_emits: AtomicU64,
    pub(crate) deferred_scheduled: AtomicU64,
    pub(crate) deferred_delivered: AtomicU64,
    pub(crate) handlers_registered: AtomicU64,
    pub(crate) handlers_removed: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BusStats {
        BusStats {
            immediate_emits: self.immediate_emits.load(Ordering::Relaxed),
            deferred_scheduled: self.deferred_scheduled.load(Ordering::Relaxed),
            deferred_delivered: self.deferred_delivered.load(Ordering::Relaxed),
            handlers_registered: self.handlers_registered.load(Ordering::Relaxed),
            handlers_removed: self.handlers_removed.load(Ordering::Relaxed),
        }
    }
}
