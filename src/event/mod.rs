mod bus;
mod events;
mod handlers;

pub use bus::{EventBus, SubscriptionId};
pub use events::{ChangeEvent, MutationKind, MutationRecord};
pub use handlers::{MutationObserver, ObserverRegistry};

/// Receives events broadcast on an [`EventBus`]
pub trait EventHandler<E> {
    fn handle_event(&mut self, event: &E);
}

impl<E, F> EventHandler<E> for F
where
    F: FnMut(&E),
{
    fn handle_event(&mut self, event: &E) {
        self(event)
    }
}
