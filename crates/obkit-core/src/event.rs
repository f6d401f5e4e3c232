//! Event system.
//!
//! - [`Event`] - Base trait for everything pushed through an event bus
//! - [`EventType`] - High-level event classification
//! - [`BoxedEvent`] - Cheaply clonable, type-erased event handle
//!
//! ```rust,ignore
//! use obkit_core::{BoxedEvent, Event};
//!
//! fn on_event(event: &BoxedEvent) {
//!     if let Some(msg) = event.downcast_ref::<MyMessageEvent>() {
//!         println!("{}: {}", event.event_name(), msg.text);
//!     }
//! }
//! ```

use std::any::Any;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Message events (private messages, group messages, etc.)
    Message,
    /// Notice events (group changes, recalls, friend adds, etc.)
    Notice,
    /// Request events (friend requests, group join requests, etc.)
    Request,
    /// Meta events (lifecycle, heartbeat, etc.)
    Meta,
    /// Events produced by the bot itself (start, send interception, etc.)
    Internal,
    /// Other/unknown event types
    Other,
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "message" | "message_sent" => EventType::Message,
            "notice" => EventType::Notice,
            "request" => EventType::Request,
            "meta" | "meta_event" => EventType::Meta,
            _ => EventType::Other,
        })
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events.
///
/// Events are type-erased using `dyn Event` and can be downcast to concrete
/// types using `as_any()`.
pub trait Event: Any + Send + Sync {
    /// Returns the human-readable name of this event type.
    fn event_name(&self) -> &'static str;

    /// Returns the platform/adapter name (e.g., "onebot").
    fn platform(&self) -> &'static str;

    /// Returns the high-level event type classification.
    fn event_type(&self) -> EventType {
        EventType::Other
    }

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the raw JSON text this event was decoded from, if any.
    fn raw_json(&self) -> Option<&str> {
        None
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` derefs to `dyn Event`, so trait methods can be called
/// directly on it.
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Wraps an already shared event without copying it.
    ///
    /// The caller keeps its own `Arc<E>` and observes every change a
    /// listener makes through interior mutability.
    pub fn from_arc<E: Event>(event: Arc<E>) -> Self {
        Self { inner: event }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Returns `true` if the event is of type `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.inner.as_any().is::<E>()
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }
}

impl std::ops::Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .field("platform", &self.platform())
            .finish()
    }
}
