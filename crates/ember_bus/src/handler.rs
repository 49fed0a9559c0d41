//! Handler abstraction and the per-event handler storage.
//!
//! A [`Handler`] is a shared handle to anything implementing [`EventHandler`].
//! Two handles are equal when they point at the same allocation, which is the
//! identity [`EventBus::off`](crate::EventBus::off) removes by. Keep a clone of
//! the handle you registered if you want to remove it later.

use serde_json::Value;
use smallvec::SmallVec;
use std::fmt::Debug;
use std::sync::Arc;

/// Something that can receive the arguments of an emission.
///
/// Every `Fn(&[Value]) + Send + Sync + 'static` closure implements this
/// trait, so most callers never implement it by hand.
pub trait EventHandler: Send + Sync + 'static {
    /// Handles one emission.
    fn call(&self, args: &[Value]);

    /// Returns a human-readable name for this handler for debugging.
    fn handler_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> EventHandler for F
where
    F: Fn(&[Value]) + Send + Sync + 'static,
{
    #[inline]
    fn call(&self, args: &[Value]) {
        self(args)
    }
}

/// Shared, cheaply cloneable handle to a registered handler.
#[derive(Clone)]
pub struct Handler(Arc<dyn EventHandler>);

impl Handler {
    /// Wraps a closure or handler value into a new handle.
    ///
    /// Each call produces a distinct identity, even for the same closure type.
    pub fn new<H: EventHandler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    /// Builds a handle from an existing shared handler.
    pub fn from_arc(handler: Arc<dyn EventHandler>) -> Self {
        Self(handler)
    }

    /// Invokes the handler.
    #[inline]
    pub fn call(&self, args: &[Value]) {
        self.0.call(args)
    }

    /// Name reported by the underlying handler.
    pub fn name(&self) -> &str {
        self.0.handler_name()
    }

    /// Returns true if both handles refer to the same handler.
    #[inline]
    pub fn same(&self, other: &Handler) -> bool {
        // Compare data pointers only; vtable pointers may differ across codegen units.
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Handler {}

impl Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("ptr", &Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

impl<H: EventHandler> From<Arc<H>> for Handler {
    fn from(handler: Arc<H>) -> Self {
        Self(handler)
    }
}

/// Handlers registered for one event name.
///
/// Most events have exactly one handler, so that case is stored inline. Lists
/// live behind an `Arc` and are copied on write: cloning a set is how both
/// dispatch modes take their snapshot, and later mutations never reach a
/// snapshot that is still being delivered.
#[derive(Clone)]
pub(crate) enum HandlerSet {
    Single(Handler),
    Many(Arc<SmallVec<[Handler; 4]>>),
}

impl HandlerSet {
    pub(crate) fn new(handler: Handler) -> Self {
        HandlerSet::Single(handler)
    }

    /// Appends a handler, promoting a single entry to a list.
    pub(crate) fn push(&mut self, handler: Handler) {
        match self {
            HandlerSet::Single(first) => {
                let mut list = SmallVec::new();
                list.push(first.clone());
                list.push(handler);
                *self = HandlerSet::Many(Arc::new(list));
            }
            HandlerSet::Many(list) => Arc::make_mut(list).push(handler),
        }
    }

    /// Removes every occurrence of `handler`.
    ///
    /// Returns the number removed and whether the set is now empty; an empty
    /// set must be dropped from the map by the caller.
    pub(crate) fn remove(&mut self, handler: &Handler) -> (usize, bool) {
        match self {
            HandlerSet::Single(only) => {
                if only.same(handler) {
                    (1, true)
                } else {
                    (0, false)
                }
            }
            HandlerSet::Many(list) => {
                let before = list.len();
                if !list.iter().any(|h| h.same(handler)) {
                    return (0, false);
                }
                let items = Arc::make_mut(list);
                items.retain(|h| !h.same(handler));
                let removed = before - items.len();
                match items.len() {
                    0 => (removed, true),
                    1 => {
                        let last = items[0].clone();
                        *self = HandlerSet::Single(last);
                        (removed, false)
                    }
                    _ => (removed, false),
                }
            }
        }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[Handler] {
        match self {
            HandlerSet::Single(handler) => std::slice::from_ref(handler),
            HandlerSet::Many(list) => list.as_slice(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        match self {
            HandlerSet::Single(_) => 1,
            HandlerSet::Many(list) => list.len(),
        }
    }
}

impl Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerSet::Single(_) => f.write_str("HandlerSet::Single"),
            HandlerSet::Many(list) => write!(f, "HandlerSet::Many({})", list.len()),
        }
    }
}
