use std::cell::{Cell, RefCell};

use crate::event::EventHandler;

/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// A simple event bus for broadcasting events to registered handlers.
///
/// Handlers must not subscribe or unsubscribe from inside `handle_event`.
pub struct EventBus<E> {
    handlers: RefCell<Vec<(SubscriptionId, Box<dyn EventHandler<E>>)>>,
    next_id: Cell<u64>,
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.borrow().len()))
            .finish()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    /// Creates a new event bus
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&self, handler: impl EventHandler<E> + 'static) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers.borrow_mut().push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Emit an event to all registered handlers
    pub fn emit(&self, event: &E) {
        for (_, handler) in self.handlers.borrow_mut().iter_mut() {
            handler.handle_event(event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_unsubscribed_handler_stops_receiving() {
        let bus = EventBus::<u32>::new();
        let seen = Rc::new(Cell::new(0));

        let counter = Rc::clone(&seen);
        let id = bus.subscribe(move |value: &u32| counter.set(counter.get() + *value));
        bus.emit(&2);
        assert!(bus.unsubscribe(id));
        bus.emit(&5);

        assert_eq!(seen.get(), 2);
        assert_eq!(bus.handler_count(), 0);
        assert!(!bus.unsubscribe(id));
    }
}
