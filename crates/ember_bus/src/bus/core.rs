/// Core EventBus implementation
use crate::config::{BusSettings, DispatchMode};
use crate::handler::HandlerSet;
use crate::scheduler::{Microtasks, Scheduler};
use super::stats::StatsCounters;
use compact_str::CompactString;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Named-event publish/subscribe hub.
///
/// `EventBus` is a handle: cloning it is cheap and every clone refers to the
/// same handler table. Use [`EventBus::ptr_eq`] to tell instances apart.
///
/// Handlers for one event name run in insertion order. Event names are exact,
/// case-sensitive keys; a name is present in the table only while at least one
/// handler is registered for it.
#[derive(Clone)]
pub struct EventBus {
    pub(super) inner: Arc<BusInner>,
}

pub(crate) struct BusInner {
    /// Event name to registered handlers
    pub(super) handlers: DashMap<CompactString, HandlerSet>,
    /// Set once by `destroy`; never cleared
    pub(super) destroyed: AtomicBool,
    pub(super) settings: BusSettings,
    /// Destination of deferred batches
    pub(super) scheduler: Arc<dyn Scheduler>,
    pub(super) stats: StatsCounters,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.inner.handlers.len())
            .field("dispatch", &self.inner.settings.dispatch)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus that delivers immediately and defers onto the
    /// thread-local microtask queue.
    pub fn new() -> Self {
        Self::with_settings(BusSettings::default())
    }

    /// Creates an empty bus whose [`emit`](Self::emit) defers delivery.
    pub fn deferred() -> Self {
        Self::with_settings(BusSettings::deferred())
    }

    /// Creates an empty bus with the given settings.
    pub fn with_settings(settings: BusSettings) -> Self {
        Self::with_scheduler(settings, Arc::new(Microtasks))
    }

    /// Creates an empty bus with the given settings and deferred scheduler.
    pub fn with_scheduler(settings: BusSettings, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                handlers: DashMap::new(),
                destroyed: AtomicBool::new(false),
                settings,
                scheduler,
                stats: StatsCounters::default(),
            }),
        }
    }

    /// Returns true if both handles refer to the same bus.
    #[inline]
    pub fn ptr_eq(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The settings this bus was built with.
    pub fn settings(&self) -> &BusSettings {
        &self.inner.settings
    }

    /// The delivery mode used by [`emit`](Self::emit).
    #[inline]
    pub fn dispatch_mode(&self) -> DispatchMode {
        self.inner.settings.dispatch
    }

    /// Returns true once [`destroy`](Self::destroy) has been called.
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }
}

impl BusInner {
    #[inline]
    pub(super) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
