//! Typed event-to-listener registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::listener::EventListener;

/// Maps event type tags to the ordered listeners consuming them.
///
/// Resolved once at start-up and then immutable; there is no runtime
/// discovery. Listeners registered first are invoked first.
#[derive(Default)]
pub struct ListenerRegistry {
    handlers: HashMap<&'static str, Vec<Arc<dyn EventListener>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for every event type it declares.
    pub fn register(&mut self, listener: Arc<dyn EventListener>) {
        for event_type in listener.event_types() {
            self.handlers
                .entry(event_type)
                .or_default()
                .push(listener.clone());
        }
    }

    /// Returns the listeners registered for an event type, in registration
    /// order.
    pub fn listeners_for(&self, event_type: &str) -> &[Arc<dyn EventListener>] {
        self.handlers
            .get(event_type)
            .map(|listeners| listeners.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the number of distinct event types with listeners.
    pub fn event_type_count(&self) -> usize {
        self.handlers.len()
    }
}
