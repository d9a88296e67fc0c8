//! Aggregates persisted as versioned JSON documents.

use uuid::Uuid;

use crate::event::DomainEvent;
use crate::repository::StoredEvent;

/// An aggregate root stored as one document per id.
///
/// Handlers mutate the aggregate in memory, which records events. The
/// repository writes the document back with compare-and-swap on
/// [`version`](Self::version) and journals the events with that write.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate records.
    type Event: DomainEvent;

    /// Collection the documents live in.
    const COLLECTION: &'static str;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Document version the aggregate was loaded at; zero before the first
    /// write.
    fn version(&self) -> i64;

    /// Stamps the version read from, or produced by, the store.
    fn set_version(&mut self, version: i64);

    /// Events recorded since the last write.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Forgets recorded events once they are journaled.
    fn clear_uncommitted_events(&mut self);

    /// Recorded events in the form the store journals.
    fn pending_stored_events(&self) -> Vec<StoredEvent> {
        self.uncommitted_events()
            .iter()
            .map(StoredEvent::from_domain_event)
            .collect()
    }
}
