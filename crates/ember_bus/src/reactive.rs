//! # Reactive Observation
//!
//! Wraps a JSON object so that property writes turn into notifications.
//!
//! [`EventBus::observe`] and [`EventBus::observe_async`] return a
//! [`Reactive`] view of the object. Reading a property hands back plain
//! values for primitives and a fresh [`Reactive`] for nested objects and
//! arrays; nothing is wrapped ahead of time. Writing a property that changes
//! its value:
//!
//! 1. stores the new value,
//! 2. calls the change callback (immediately for `observe`, through the bus
//!    scheduler for `observe_async`),
//! 3. emits `<prefix><property>` on the owning bus with the new value as its
//!    only argument, using immediate dispatch.
//!
//! ```rust
//! use ember_bus::{EventBus, Field, Handler};
//! use serde_json::{json, Value};
//!
//! let bus = EventBus::new();
//! bus.on("observe:hp", Handler::new(|args: &[Value]| println!("hp is now {}", args[0])));
//!
//! let player = bus.observe(
//!     json!({"hp": 10, "pos": {"x": 0}}).as_object().cloned().unwrap(),
//!     |change| println!("{} changed", change.property),
//! );
//! player.set("hp", json!(7));
//! if let Some(Field::Object(pos)) = player.get("pos") {
//!     pos.set("x", json!(3));
//! }
//! ```

use crate::bus::EventBus;
use crate::config::DispatchMode;
use compact_str::{format_compact, CompactString};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Description of one observed write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyChange {
    /// Location of the written object, from the observed root
    pub path: Vec<CompactString>,
    /// Property that was written
    pub property: CompactString,
    /// Value before the write, `None` if the property did not exist
    pub previous: Option<Value>,
    /// Value after the write
    pub value: Value,
}

/// Callback invoked for every observed change.
pub type ChangeCallback = Arc<dyn Fn(&PropertyChange) + Send + Sync + 'static>;

/// Result of reading a property through a [`Reactive`].
#[derive(Debug, Clone)]
pub enum Field {
    /// Primitive value (null, bool, number or string)
    Value(Value),
    /// Nested object or array, wrapped on this read
    Object(Reactive),
}

impl Field {
    /// Returns the primitive value, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Object(_) => None,
        }
    }

    /// Returns the nested wrapper, if this is one.
    pub fn into_object(self) -> Option<Reactive> {
        match self {
            Field::Object(reactive) => Some(reactive),
            Field::Value(_) => None,
        }
    }
}

struct Observer {
    bus: EventBus,
    callback: ChangeCallback,
    mode: DispatchMode,
}

/// Change-detecting view over an observed JSON object.
///
/// A `Reactive` addresses its node by path from the observed root, so nested
/// wrappers obtained from separate reads all see (and write) the same data.
#[derive(Clone)]
pub struct Reactive {
    root: Arc<Mutex<Value>>,
    path: Vec<CompactString>,
    observer: Arc<Observer>,
}

impl std::fmt::Debug for Reactive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactive")
            .field("path", &self.path)
            .field("mode", &self.observer.mode)
            .finish()
    }
}

impl EventBus {
    /// Observes `target`, calling `callback` synchronously on every change.
    pub fn observe<F>(&self, target: Map<String, Value>, callback: F) -> Reactive
    where
        F: Fn(&PropertyChange) + Send + Sync + 'static,
    {
        Reactive::new(self.clone(), target, Arc::new(callback), DispatchMode::Immediate)
    }

    /// Observes `target`, calling `callback` through the bus scheduler on
    /// every change. The `observe:` event is still emitted immediately.
    pub fn observe_async<F>(&self, target: Map<String, Value>, callback: F) -> Reactive
    where
        F: Fn(&PropertyChange) + Send + Sync + 'static,
    {
        Reactive::new(self.clone(), target, Arc::new(callback), DispatchMode::Deferred)
    }
}

impl Reactive {
    fn new(bus: EventBus, target: Map<String, Value>, callback: ChangeCallback, mode: DispatchMode) -> Self {
        Self {
            root: Arc::new(Mutex::new(Value::Object(target))),
            path: Vec::new(),
            observer: Arc::new(Observer { bus, callback, mode }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        // A panicking callback never runs under this lock, so the data is intact.
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Location of this node from the observed root.
    pub fn path(&self) -> &[CompactString] {
        &self.path
    }

    /// Bus that receives this wrapper's change events.
    pub fn bus(&self) -> &EventBus {
        &self.observer.bus
    }

    /// Copy of the current node, or `Value::Null` if it no longer exists.
    pub fn snapshot(&self) -> Value {
        let root = self.lock();
        resolve(&root, &self.path).cloned().unwrap_or(Value::Null)
    }

    /// Reads `property`.
    ///
    /// Objects and arrays come back as a new wrapper on every call; array
    /// elements are addressed by decimal index.
    pub fn get(&self, property: &str) -> Option<Field> {
        let root = self.lock();
        let node = resolve(&root, &self.path)?;
        match child(node, property)? {
            Value::Object(_) | Value::Array(_) => {
                let mut path = self.path.clone();
                path.push(CompactString::new(property));
                Some(Field::Object(Reactive {
                    root: Arc::clone(&self.root),
                    path,
                    observer: Arc::clone(&self.observer),
                }))
            }
            primitive => Some(Field::Value(primitive.clone())),
        }
    }

    /// Writes `property` and notifies if the value changed.
    ///
    /// Always returns `true`: writes are never rejected. Writes that cannot be
    /// stored are dropped without notification: the node was replaced by a
    /// primitive, or an array key is not a canonical index no further than one
    /// past the end.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let previous = {
            let mut root = self.lock();
            let Some(node) = resolve_mut(&mut root, &self.path) else {
                debug!("Dropping write to '{}': observed node no longer exists", property);
                return true;
            };
            match store(node, property, &value) {
                Store::Changed(previous) => previous,
                Store::Unchanged => return true,
                Store::Rejected => {
                    debug!("Dropping write to '{}': node cannot hold that key", property);
                    return true;
                }
            }
        };

        let change = PropertyChange {
            path: self.path.clone(),
            property: CompactString::new(property),
            previous,
            value,
        };
        self.notify(change);
        true
    }

    fn notify(&self, change: PropertyChange) {
        let observer = &self.observer;
        let event = format_compact!("{}{}", observer.bus.settings().observe_prefix, change.property);
        trace!("🔁 Observed change on {}", event);
        let value = change.value.clone();

        match observer.mode {
            DispatchMode::Immediate => (observer.callback)(&change),
            DispatchMode::Deferred => {
                let callback = Arc::clone(&observer.callback);
                observer.bus.defer(Box::new(move || callback(&change)));
            }
        }

        observer.bus.emit_sync(&event, &[value]);
    }
}

enum Store {
    Changed(Option<Value>),
    Unchanged,
    Rejected,
}

fn store(node: &mut Value, property: &str, value: &Value) -> Store {
    match node {
        Value::Object(map) => match map.get_mut(property) {
            Some(current) if current == value => Store::Unchanged,
            Some(current) => Store::Changed(Some(std::mem::replace(current, value.clone()))),
            None => {
                map.insert(property.to_string(), value.clone());
                Store::Changed(None)
            }
        },
        Value::Array(items) => {
            let Some(index) = array_index(property) else {
                return Store::Rejected;
            };
            let len = items.len();
            match items.get_mut(index) {
                Some(current) if current == value => Store::Unchanged,
                Some(current) => Store::Changed(Some(std::mem::replace(current, value.clone()))),
                None if index == len => {
                    items.push(value.clone());
                    Store::Changed(None)
                }
                None => Store::Rejected,
            }
        }
        _ => Store::Rejected,
    }
}

/// Parses `key` as an array index, accepting only the canonical decimal form.
fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<usize>().ok()?;
    (index.to_string() == key).then_some(index)
}

fn child<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => array_index(key).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(key),
        Value::Array(items) => array_index(key).and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

fn resolve<'a>(root: &'a Value, path: &[CompactString]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| child(node, key))
}

fn resolve_mut<'a>(root: &'a mut Value, path: &[CompactString]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |node, key| child_mut(node, key))
}
