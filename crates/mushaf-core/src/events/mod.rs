use std::any::{Any, TypeId};
use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

/// Session-wide event bus
///
/// Handlers run synchronously inside `publish` and must not publish themselves.
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Reader session events
pub mod events {
    use super::Event;
    use crate::navigation::Position;
    use crate::sync::ViewportRole;

    /// A print edition's page table was installed
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EditionLoaded {
        pub edition: String,
        pub page_count: u32,
        /// Raw page carrying the first verse
        pub start_offset: u32,
    }

    /// A requested edition is not installed or its data was rejected
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EditionUnavailable {
        pub edition: String,
        pub reason: String,
    }

    /// The layout switched between regular and compact
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LayoutModeChanged {
        pub compact: bool,
        pub authoritative: ViewportRole,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ViewportOpened {
        pub role: ViewportRole,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ViewportClosed {
        pub role: ViewportRole,
    }

    /// The persisted reading position changed; `None` after a reset
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ReadingPositionSaved {
        pub position: Option<Position>,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        EditionLoaded,
        EditionUnavailable,
        LayoutModeChanged,
        ViewportOpened,
        ViewportClosed,
        ReadingPositionSaved
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Subscribe a closure receiving the concrete event type
    pub fn subscribe_fn<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
