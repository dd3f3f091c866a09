//! Audit trail
//!
//! Every successful mutation is recorded as an immutable event, giving each
//! manuscript, invitation and user a complete history.

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{EntityType, Event, EventId, EventPayload};
