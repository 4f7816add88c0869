use crate::event::{MutationRecord, SubscriptionId};
use crate::text::StructuredTextDocument;

/// Observes edits of the editable root and may correct it in place
pub trait MutationObserver {
    fn observe(&mut self, record: &MutationRecord, document: &mut StructuredTextDocument);
}

/// Mutation observers owned by a single text surface
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(SubscriptionId, Box<dyn MutationObserver>)>,
    next_id: u64,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn MutationObserver>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId::new(self.next_id);
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn notify(&mut self, record: &MutationRecord, document: &mut StructuredTextDocument) {
        for (_, observer) in &mut self.observers {
            observer.observe(record, document);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
