//! Event bus.
//!
//! The [`EventBus`] is the seam between a protocol engine and the
//! application: the engine pushes events in and receives one
//! [`EventResult`] per listener invocation back as a stream.
//!
//! [`EventDispatcher`] is the in-process implementation. Listeners run
//! sequentially in registration order, so a listener observes every change
//! the listeners registered before it made to a shared event.
//!
//! ```rust,ignore
//! use obkit_core::{EventBus, EventDispatcher};
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.listen(|event| async move {
//!     println!("received {}", event.event_name());
//!     Ok(())
//! });
//!
//! let errors = dispatcher.push(event).filter(|r| r.is_error()).count().await;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parking_lot::RwLock;
use tracing::{Instrument, debug, debug_span};

use crate::event::{BoxedEvent, Event};

// ============================================================================
// Results
// ============================================================================

/// The outcome of a single listener invocation.
#[derive(Debug)]
pub enum EventResult {
    /// The listener completed normally.
    Handled,
    /// The listener failed.
    Error(anyhow::Error),
}

impl EventResult {
    /// Returns `true` if the listener failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the listener error, if any.
    pub fn into_error(self) -> Option<anyhow::Error> {
        match self {
            Self::Handled => None,
            Self::Error(err) => Some(err),
        }
    }
}

impl From<anyhow::Result<()>> for EventResult {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Self::Handled,
            Err(err) => Self::Error(err),
        }
    }
}

// ============================================================================
// Bus & Listener Traits
// ============================================================================

/// Destination for every event a bot produces.
pub trait EventBus: Send + Sync {
    /// Pushes an event and returns the listener results in invocation order.
    ///
    /// Listeners run lazily as the stream is polled.
    fn push(&self, event: BoxedEvent) -> BoxStream<'static, EventResult>;
}

/// A listener registered on an [`EventDispatcher`].
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Returns `true` if this listener wants to see the event.
    fn accepts(&self, _event: &BoxedEvent) -> bool {
        true
    }

    /// Handles one event.
    async fn on_event(&self, event: BoxedEvent) -> anyhow::Result<()>;
}

/// Listener backed by an async closure.
pub struct FnListener<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> EventListener for FnListener<F>
where
    F: Fn(BoxedEvent) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn on_event(&self, event: BoxedEvent) -> anyhow::Result<()> {
        (self.f)(event).await
    }
}

/// Listener that only sees events of type `E`.
pub struct TypedListener<E, F> {
    f: F,
    _marker: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E, F, Fut> EventListener for TypedListener<E, F>
where
    E: Event,
    F: Fn(BoxedEvent) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    fn accepts(&self, event: &BoxedEvent) -> bool {
        event.is::<E>()
    }

    async fn on_event(&self, event: BoxedEvent) -> anyhow::Result<()> {
        (self.f)(event).await
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// In-process event bus.
///
/// Listeners may be added at any time; a push sees the listeners registered
/// at the moment it was called.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventDispatcher {
    /// Creates a new, empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Listeners run in registration order.
    pub fn register(&self, listener: impl EventListener + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Registers an async closure receiving every event.
    pub fn listen<F, Fut>(&self, f: F)
    where
        F: Fn(BoxedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(FnListener { f });
    }

    /// Registers an async closure receiving only events of type `E`.
    pub fn listen_to<E, F, Fut>(&self, f: F)
    where
        E: Event,
        F: Fn(BoxedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(TypedListener::<E, F> {
            f,
            _marker: PhantomData,
        });
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Removes all listeners.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}

impl EventBus for EventDispatcher {
    fn push(&self, event: BoxedEvent) -> BoxStream<'static, EventResult> {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .filter(|listener| listener.accepts(&event))
            .cloned()
            .collect();

        debug!(
            event_name = event.event_name(),
            listeners = listeners.len(),
            "Dispatching event"
        );

        stream::iter(listeners)
            .then(move |listener| {
                let event = event.clone();
                let span = debug_span!("listener", event_name = event.event_name());
                async move { EventResult::from(listener.on_event(event).await) }.instrument(span)
            })
            .boxed()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestEvent;

    impl Event for TestEvent {
        fn event_name(&self) -> &'static str {
            "test"
        }

        fn platform(&self) -> &'static str {
            "test"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct OtherEvent;

    impl Event for OtherEvent {
        fn event_name(&self) -> &'static str {
            "other"
        }

        fn platform(&self) -> &'static str {
            "test"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_push_without_listeners() {
        let dispatcher = EventDispatcher::new();
        let results: Vec<_> = dispatcher.push(BoxedEvent::new(TestEvent)).collect().await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_listeners_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = EventDispatcher::new();

        for i in 0..3 {
            let order = Arc::clone(&order);
            dispatcher.listen(move |_| {
                let order = Arc::clone(&order);
                async move {
                    order.lock().push(i);
                    Ok(())
                }
            });
        }

        let results: Vec<_> = dispatcher.push(BoxedEvent::new(TestEvent)).collect().await;
        assert_eq!(results.len(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_errors_are_reported_not_raised() {
        let counter = Arc::new(AtomicUsize::new(0));
        let dispatcher = EventDispatcher::new();

        dispatcher.listen(|_| async { Err(anyhow!("boom")) });
        let c = Arc::clone(&counter);
        dispatcher.listen(move |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let results: Vec<_> = dispatcher.push(BoxedEvent::new(TestEvent)).collect().await;
        assert!(results[0].is_error());
        assert!(!results[1].is_error());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_typed_listener_filters() {
        let counter = Arc::new(AtomicUsize::new(0));
        let dispatcher = EventDispatcher::new();

        let c = Arc::clone(&counter);
        dispatcher.listen_to::<OtherEvent, _, _>(move |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let results: Vec<_> = dispatcher.push(BoxedEvent::new(TestEvent)).collect().await;
        assert!(results.is_empty());

        let results: Vec<_> = dispatcher.push(BoxedEvent::new(OtherEvent)).collect().await;
        assert_eq!(results.len(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
