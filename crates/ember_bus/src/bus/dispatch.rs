/// Event emission: immediate and deferred delivery
use super::core::{BusInner, EventBus};
use super::stats::StatsCounters;
use crate::config::DispatchMode;
use crate::handler::{Handler, HandlerSet};
use crate::scheduler::Task;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

/// Owned emission arguments carried by a deferred batch.
type OwnedArgs = SmallVec<[Value; 2]>;

impl EventBus {
    /// Emits `event` using the bus's default [`DispatchMode`].
    #[inline]
    pub fn emit(&self, event: &str, args: &[Value]) {
        match self.inner.settings.dispatch {
            DispatchMode::Immediate => self.emit_sync(event, args),
            DispatchMode::Deferred => self.emit_async(event, args),
        }
    }

    /// Delivers `args` to every handler of `event` before returning.
    ///
    /// The handler set is captured when the call starts: handlers added during
    /// delivery wait for the next emission, and handlers removed during
    /// delivery still receive this one. A panicking handler unwinds through
    /// this call and the remaining handlers are skipped.
    pub fn emit_sync(&self, event: &str, args: &[Value]) {
        let Some(snapshot) = self.inner.snapshot(event) else {
            return;
        };
        StatsCounters::bump(&self.inner.stats.immediate_emits, 1);
        trace!("📤 Emitting {} to {} handlers", event, snapshot.len());
        deliver(snapshot.as_slice(), args);
    }

    /// Schedules one task that delivers `args` to the handlers of `event`.
    ///
    /// The handler set is captured now, not when the task runs: handlers
    /// added or removed after this call returns do not change the batch.
    /// Nothing is scheduled when `event` has no handlers. Batches are
    /// delivered in the order they were scheduled, and skipped entirely if
    /// the bus is destroyed before they run.
    pub fn emit_async(&self, event: &str, args: &[Value]) {
        let Some(snapshot) = self.inner.snapshot(event) else {
            return;
        };
        let args: OwnedArgs = args.iter().cloned().collect();
        let bus = Arc::clone(&self.inner);

        StatsCounters::bump(&self.inner.stats.deferred_scheduled, 1);
        trace!("⏳ Deferring {} for {} handlers", event, snapshot.len());

        self.inner.scheduler.schedule(Box::new(move || {
            if bus.is_destroyed() {
                trace!("Dropping deferred batch for a destroyed bus");
                return;
            }
            StatsCounters::bump(&bus.stats.deferred_delivered, 1);
            deliver(snapshot.as_slice(), &args);
        }));
    }

    /// Hands `task` to this bus's scheduler.
    pub(crate) fn defer(&self, task: Task) {
        self.inner.scheduler.schedule(task);
    }
}

impl BusInner {
    /// Clones the handler set for `event`, releasing the map guard before
    /// returning so handlers may re-enter the bus.
    fn snapshot(&self, event: &str) -> Option<HandlerSet> {
        if self.is_destroyed() {
            return None;
        }
        let snapshot = self.handlers.get(event).map(|entry| entry.value().clone());
        if snapshot.is_none() && self.settings.trace_unhandled {
            trace!("No handlers for event: {}", event);
        }
        snapshot
    }
}

/// Calls each handler in order, four per iteration.
#[inline]
fn deliver(handlers: &[Handler], args: &[Value]) {
    let mut chunks = handlers.chunks_exact(4);
    for chunk in &mut chunks {
        chunk[0].call(args);
        chunk[1].call(args);
        chunk[2].call(args);
        chunk[3].call(args);
    }
    for handler in chunks.remainder() {
        handler.call(args);
    }
}
