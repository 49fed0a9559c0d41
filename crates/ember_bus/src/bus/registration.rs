/// Handler registration and removal
use super::core::{BusInner, EventBus};
use super::stats::StatsCounters;
use crate::handler::{EventHandler, Handler, HandlerSet};
use compact_str::CompactString;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

impl EventBus {
    /// Appends `handler` to the handlers of `event`.
    ///
    /// There is no de-duplication: registering the same handle twice makes it
    /// run twice per emission. Registrations made after
    /// [`destroy`](Self::destroy) are dropped.
    pub fn on(&self, event: &str, handler: Handler) {
        if self.inner.is_destroyed() {
            debug!("Ignoring registration for '{}' on a destroyed bus", event);
            return;
        }

        match self.inner.handlers.entry(CompactString::new(event)) {
            Entry::Occupied(mut entry) => entry.get_mut().push(handler),
            Entry::Vacant(entry) => {
                entry.insert(HandlerSet::new(handler));
            }
        }
        StatsCounters::bump(&self.inner.stats.handlers_registered, 1);
        trace!("📝 Registered handler for {}", event);
    }

    /// Registers `handler` for the first delivered emission of `event` only.
    ///
    /// The returned handle is the one-shot wrapper actually stored on the bus;
    /// pass it to [`off`](Self::off) to cancel before it fires. The wrapper
    /// removes itself before calling `handler`, so a handler that re-emits the
    /// same event is not triggered again by its own registration. Every call
    /// creates an independent wrapper.
    pub fn once(&self, event: &str, handler: Handler) -> Handler {
        let event_name = CompactString::new(event);
        let bus = Arc::downgrade(&self.inner);
        let wrapper: Arc<OnceHandler> = Arc::new_cyclic(|me| OnceHandler {
            fired: AtomicBool::new(false),
            event: event_name,
            bus,
            me: me.clone(),
            handler,
        });
        let wrapper = Handler::from(wrapper);
        self.on(event, wrapper.clone());
        wrapper
    }

    /// Removes handlers from `event`.
    ///
    /// With `Some(handler)`, removes every registration of that exact handle;
    /// with `None`, drops the whole entry. Removing something that is not
    /// registered is a no-op.
    pub fn off(&self, event: &str, handler: Option<&Handler>) {
        self.inner.remove(event, handler);
    }
}

impl BusInner {
    pub(super) fn remove(&self, event: &str, handler: Option<&Handler>) -> usize {
        let removed = match handler {
            None => self
                .handlers
                .remove(event)
                .map(|(_, set)| set.len())
                .unwrap_or(0),
            Some(handler) => match self.handlers.entry(CompactString::new(event)) {
                Entry::Occupied(mut entry) => {
                    let (removed, now_empty) = entry.get_mut().remove(handler);
                    if now_empty {
                        entry.remove();
                    }
                    removed
                }
                Entry::Vacant(_) => 0,
            },
        };

        if removed > 0 {
            StatsCounters::bump(&self.stats.handlers_removed, removed as u64);
            trace!("Removed {} handler(s) from {}", removed, event);
        }
        removed
    }
}

/// One-shot wrapper created by [`EventBus::once`].
struct OnceHandler {
    /// Guards against delivery from a second snapshot that still holds us
    fired: AtomicBool,
    event: CompactString,
    bus: Weak<BusInner>,
    me: Weak<OnceHandler>,
    handler: Handler,
}

impl EventHandler for OnceHandler {
    fn call(&self, args: &[Value]) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        if let (Some(bus), Some(me)) = (self.bus.upgrade(), self.me.upgrade()) {
            bus.remove(&self.event, Some(&Handler::from(me)));
        }
        self.handler.call(args);
    }

    fn handler_name(&self) -> &str {
        self.handler.name()
    }
}
