//! Error types for the consumer-facing layers of the bus.
//!
//! The bus itself never fails: unknown event names, redundant removals and
//! calls made after [`EventBus::destroy`](crate::EventBus::destroy) are silent
//! no-ops. Errors only come from validation done by the glue around it
//! (registry, subscriptions, settings).

/// Errors raised by registry lookups, subscriptions and settings validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// Event name was empty or whitespace only
    #[error("Invalid event name {0:?}: it must be a non-empty string")]
    InvalidEventName(String),

    /// No bus is registered under the requested identifier
    #[error("No event bus registered under id {0:?}")]
    InstanceNotFound(String),

    /// Registry identifier was empty or whitespace only
    #[error("Invalid instance id {0:?}: it must be a non-empty string")]
    InvalidInstanceId(String),

    /// Settings failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Checks that an event name is usable by a subscriber.
///
/// The bus accepts any key; this is the boundary check performed by
/// [`Subscription`](crate::context::Subscription).
pub fn validate_event_name(name: &str) -> Result<(), BusError> {
    if name.trim().is_empty() {
        return Err(BusError::InvalidEventName(name.to_string()));
    }
    Ok(())
}
