//! Provider scopes and subscription guards.
//!
//! A [`ProviderScope`] makes a bus the ambient one for the current thread
//! until the scope is dropped. A [`Subscription`] resolves which bus to use,
//! registers a handler on it, and removes the handler again when dropped.
//!
//! ```
//! use ember_bus::{EventBus, Handler, ProviderScope, Subscription, SubscriptionOptions};
//! use serde_json::Value;
//!
//! let bus = EventBus::new();
//! let _scope = ProviderScope::enter(Some(bus.clone()));
//!
//! let subscription = Subscription::new(
//!     "saved",
//!     Handler::new(|_: &[Value]| {}),
//!     SubscriptionOptions::default().namespace("editor"),
//! )
//! .unwrap();
//!
//! assert_eq!(subscription.event_name(), "editor:saved");
//! assert_eq!(bus.listener_count("editor:saved"), 1);
//! drop(subscription);
//! assert_eq!(bus.listener_count("editor:saved"), 0);
//! ```

use crate::bus::EventBus;
use crate::error::{validate_event_name, BusError};
use crate::handler::Handler;
use crate::registry;
use compact_str::{format_compact, CompactString};
use std::cell::RefCell;
use std::marker::PhantomData;
use tracing::{debug, trace};

thread_local! {
    static PROVIDERS: RefCell<Vec<EventBus>> = const { RefCell::new(Vec::new()) };
}

/// The bus supplied by the innermost live [`ProviderScope`] on this thread.
pub fn current_provider() -> Option<EventBus> {
    PROVIDERS.with(|stack| stack.borrow().last().cloned())
}

/// Makes a bus the current provider for this thread while it is alive.
///
/// Scopes nest; dropping one restores whatever was current before it was
/// entered.
#[must_use = "the provider is removed as soon as the scope is dropped"]
pub struct ProviderScope {
    bus: EventBus,
    depth: usize,
    id: Option<CompactString>,
    // Tied to the thread-local stack it was pushed on.
    _not_send: PhantomData<*const ()>,
}

impl ProviderScope {
    /// Provides `bus`, or the shared default bus when `None`.
    pub fn enter(bus: Option<EventBus>) -> Self {
        let bus = bus.unwrap_or_else(registry::default_bus);
        let depth = PROVIDERS.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(bus.clone());
            stack.len() - 1
        });
        trace!("Entered provider scope at depth {}", depth);
        Self {
            bus,
            depth,
            id: None,
            _not_send: PhantomData,
        }
    }

    /// Provides a bus and also registers it under `id` for the lifetime of
    /// the scope.
    pub fn enter_with_id(id: &str, bus: Option<EventBus>) -> Result<Self, BusError> {
        let bus = bus.unwrap_or_else(EventBus::new);
        registry::register_instance(id, bus.clone())?;
        let mut scope = Self::enter(Some(bus));
        scope.id = Some(CompactString::new(id));
        Ok(scope)
    }

    /// The provided bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The registry id this scope registered, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Drop for ProviderScope {
    fn drop(&mut self) {
        PROVIDERS.with(|stack| stack.borrow_mut().truncate(self.depth));
        if let Some(id) = &self.id {
            // A newer provider may have claimed the id in the meantime.
            if registry::unregister_if_same(id, &self.bus) {
                debug!("Provider scope for '{}' ended", id);
            }
        }
    }
}

/// How a [`Subscription`] picks its bus and event name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Prefixed to the event name as `namespace:event`.
    pub namespace: Option<String>,
    /// Registry id of the bus to use instead of the current provider.
    pub id: Option<String>,
}

impl SubscriptionOptions {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A handler registered on a resolved bus, removed again on drop.
#[must_use = "the handler is removed as soon as the subscription is dropped"]
pub struct Subscription {
    bus: EventBus,
    event_name: CompactString,
    handler: Handler,
}

impl Subscription {
    /// Registers `handler` for `event_name` on the resolved bus.
    ///
    /// The bus is the one registered under `options.id` when an id is given
    /// (failing with [`BusError::InstanceNotFound`] if there is none), else
    /// the current provider, else the shared default bus.
    pub fn new(
        event_name: &str,
        handler: Handler,
        options: SubscriptionOptions,
    ) -> Result<Self, BusError> {
        let (bus, event_name) = resolve(event_name, &options)?;
        bus.on(&event_name, handler.clone());
        trace!("Subscribed {} to {}", handler.name(), event_name);
        Ok(Self {
            bus,
            event_name,
            handler,
        })
    }

    /// Re-resolves the subscription and moves the handler only if the bus,
    /// the full event name, or the handler itself changed.
    ///
    /// On error the existing registration is left untouched.
    pub fn update(
        &mut self,
        event_name: &str,
        handler: Handler,
        options: SubscriptionOptions,
    ) -> Result<(), BusError> {
        let (bus, event_name) = resolve(event_name, &options)?;
        if bus.ptr_eq(&self.bus) && event_name == self.event_name && handler.same(&self.handler) {
            return Ok(());
        }

        self.bus.off(&self.event_name, Some(&self.handler));
        bus.on(&event_name, handler.clone());
        trace!("Resubscribed {} to {}", handler.name(), event_name);

        self.bus = bus;
        self.event_name = event_name;
        self.handler = handler;
        Ok(())
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The full event name, including any namespace.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.off(&self.event_name, Some(&self.handler));
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event_name", &self.event_name)
            .field("handler", &self.handler)
            .finish()
    }
}

fn resolve(
    event_name: &str,
    options: &SubscriptionOptions,
) -> Result<(EventBus, CompactString), BusError> {
    validate_event_name(event_name)?;

    let bus = match options.id.as_deref() {
        Some(id) => registry::require_instance(id)?,
        None => current_provider().unwrap_or_else(registry::default_bus),
    };

    let full_name = match options.namespace.as_deref() {
        Some(namespace) => format_compact!("{}:{}", namespace, event_name),
        None => CompactString::new(event_name),
    };
    Ok((bus, full_name))
}
