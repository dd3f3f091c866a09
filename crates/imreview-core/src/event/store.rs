//! Event store for the audit trail

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::Event;

/// Trait for event storage backends
pub trait EventStore: Send + Sync {
    /// Append an event, assigning its sequence number
    fn append(&mut self, event: Event) -> Event;

    /// Get all events for an entity, oldest first
    fn events_for_entity(&self, entity_id: &str) -> Vec<&Event>;

    /// Get the current sequence number
    fn current_sequence(&self) -> u64;

    /// Get all events in order
    fn all_events(&self) -> Vec<&Event>;
}

/// In-memory event store implementation
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Vec<Event>,
    index_by_entity: HashMap<String, Vec<usize>>,
    sequence: AtomicU64,
}

impl InMemoryEventStore {
    /// Create a new in-memory event store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted events, keeping their sequence numbers
    pub fn from_events(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.sequence);
        let mut store = Self::new();
        let last = events.last().map(|e| e.sequence).unwrap_or(0);
        for event in events {
            store.index(event);
        }
        store.sequence = AtomicU64::new(last);
        store
    }

    fn index(&mut self, event: Event) {
        let idx = self.events.len();
        self.index_by_entity
            .entry(event.entity_id.clone())
            .or_default()
            .push(idx);
        self.events.push(event);
    }

    /// Get the number of events in the store
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&mut self, mut event: Event) -> Event {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        event.sequence = seq;
        self.index(event.clone());
        event
    }

    fn events_for_entity(&self, entity_id: &str) -> Vec<&Event> {
        self.index_by_entity
            .get(entity_id)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| self.events.get(idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    fn all_events(&self) -> Vec<&Event> {
        self.events.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EntityType, EventPayload};
    use chrono::Utc;

    fn event(entity: &str) -> Event {
        Event::new(
            entity,
            EntityType::Invitation,
            EventPayload::InvitationExpired,
            Utc::now(),
        )
    }

    #[test]
    fn test_append_assigns_sequence() {
        let mut store = InMemoryEventStore::new();
        let a = store.append(event("tok-1"));
        let b = store.append(event("tok-2"));
        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(store.current_sequence(), 2);
        assert_eq!(store.events_for_entity("tok-1").len(), 1);
    }

    #[test]
    fn test_restore_continues_sequence() {
        let mut store = InMemoryEventStore::new();
        store.append(event("a"));
        store.append(event("a"));
        let events: Vec<Event> = store.all_events().into_iter().cloned().collect();

        let mut restored = InMemoryEventStore::from_events(events);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.append(event("a")).sequence, 3);
        assert_eq!(restored.events_for_entity("a").len(), 3);
    }
}
