//! In-memory implementation of the `DocumentStore` trait.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use taleweaver_core::clock::{Clock, SystemClock};
use taleweaver_core::error::DomainError;
use taleweaver_core::repository::{DocumentChanged, DocumentStore, StoredDocument, StoredEvent};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::hub::SubscriptionHub;

/// Most recent events kept per document; older ones are dropped.
pub const JOURNAL_CAPACITY: usize = 256;

type DocumentKey = (String, Uuid);

struct Entry {
    document: StoredDocument,
    journal: VecDeque<StoredEvent>,
}

/// Process-local document store. Each write is atomic under one mutex, which
/// is held only for the compare-and-swap itself. A document's journal goes
/// away with the document.
pub struct InMemoryDocumentStore {
    entries: Mutex<HashMap<DocumentKey, Entry>>,
    hub: SubscriptionHub,
    clock: Arc<dyn Clock>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hub: SubscriptionHub::default(),
            clock,
        }
    }

    /// Returns the journaled events of one document, oldest first.
    pub fn journal_for(&self, collection: &str, id: Uuid) -> Vec<StoredEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(collection.to_owned(), id))
            .map(|entry| entry.journal.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, DomainError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(&(collection.to_owned(), id))
            .map(|entry| entry.document.clone()))
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<Uuid>, DomainError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| *id)
            .collect())
    }

    async fn save(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        body: serde_json::Value,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        let new_version = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let key = (collection.to_owned(), id);
            let actual = entries.get(&key).map_or(0, |e| e.document.version);
            if actual != expected_version {
                debug!(%id, expected_version, actual, "rejecting stale write");
                return Err(DomainError::VersionConflict {
                    collection: collection.to_owned(),
                    id,
                    expected: expected_version,
                    actual,
                });
            }
            let new_version = actual + 1;
            let document = StoredDocument {
                collection: collection.to_owned(),
                id,
                version: new_version,
                body,
                updated_at: self.clock.now(),
            };
            let mut journal = entries.remove(&key).map(|e| e.journal).unwrap_or_default();
            journal.extend(events.iter().cloned());
            let overflow = journal.len().saturating_sub(JOURNAL_CAPACITY);
            journal.drain(..overflow);
            entries.insert(key, Entry { document, journal });
            new_version
        };

        self.hub.publish(DocumentChanged {
            collection: collection.to_owned(),
            id,
            version: new_version,
            events: events.to_vec(),
        });

        Ok(new_version)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), DomainError> {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(collection.to_owned(), id));
        if removed.is_some() {
            self.hub.publish(DocumentChanged {
                collection: collection.to_owned(),
                id,
                version: 0,
                events: Vec::new(),
            });
        }
        Ok(())
    }

    fn subscribe(&self, collection: &str, id: Uuid) -> broadcast::Receiver<DocumentChanged> {
        self.hub.subscribe(collection, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event_for(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id,
            event_type: "session.test".to_owned(),
            payload: serde_json::json!({ "n": sequence_number }),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_load_returns_none_for_missing_document() {
        let store = InMemoryDocumentStore::new();
        let loaded = store.load("sessions", Uuid::new_v4()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_with_expected_zero_creates_version_one() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();

        // Act
        let version = store
            .save("sessions", id, 0, serde_json::json!({ "a": 1 }), &[])
            .await
            .unwrap();

        // Assert
        assert_eq!(version, 1);
        let doc = store.load("sessions", id).await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.body["a"], 1);
    }

    #[tokio::test]
    async fn test_save_with_stale_version_is_a_conflict() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();
        store
            .save("sessions", id, 0, serde_json::json!({}), &[])
            .await
            .unwrap();
        store
            .save("sessions", id, 1, serde_json::json!({ "winner": true }), &[])
            .await
            .unwrap();

        // Act
        let result = store
            .save("sessions", id, 1, serde_json::json!({ "loser": true }), &[])
            .await;

        // Assert
        match result.unwrap_err() {
            DomainError::VersionConflict {
                collection,
                id: conflicting,
                expected,
                actual,
            } => {
                assert_eq!(collection, "sessions");
                assert_eq!(conflicting, id);
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }
        let doc = store.load("sessions", id).await.unwrap().unwrap();
        assert_eq!(doc.body["winner"], true);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();
        store
            .save("campaigns", id, 0, serde_json::json!({}), &[])
            .await
            .unwrap();

        assert!(store.load("sessions", id).await.unwrap().is_none());
        assert_eq!(store.list_ids("campaigns").await.unwrap(), vec![id]);
        assert!(store.list_ids("sessions").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_journals_and_publishes_events() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();
        let mut rx = store.subscribe("sessions", id);
        let events = vec![event_for(id, 1), event_for(id, 2)];

        // Act
        store
            .save("sessions", id, 0, serde_json::json!({}), &events)
            .await
            .unwrap();

        // Assert
        let change = rx.recv().await.unwrap();
        assert_eq!(change.version, 1);
        assert_eq!(change.events.len(), 2);
        assert_eq!(store.journal_for("sessions", id).len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_write_publishes_nothing() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();
        store
            .save("sessions", id, 0, serde_json::json!({}), &[])
            .await
            .unwrap();
        let mut rx = store.subscribe("sessions", id);

        // Act
        let result = store
            .save("sessions", id, 5, serde_json::json!({}), &[event_for(id, 1)])
            .await;

        // Assert
        assert!(result.is_err());
        assert!(rx.try_recv().is_err());
        assert!(store.journal_for("sessions", id).is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_document_and_notifies() {
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();
        store
            .save("sessions", id, 0, serde_json::json!({}), &[])
            .await
            .unwrap();
        let mut rx = store.subscribe("sessions", id);

        store.delete("sessions", id).await.unwrap();

        assert!(store.load("sessions", id).await.unwrap().is_none());
        assert_eq!(rx.recv().await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_journal_is_capped_and_dropped_on_delete() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();
        let mut version = 0;
        for n in 0..JOURNAL_CAPACITY + 10 {
            let sequence = i64::try_from(n).unwrap() + 1;
            let events = [event_for(id, sequence)];
            version = store
                .save("sessions", id, version, serde_json::json!({}), &events)
                .await
                .unwrap();
        }

        // Act
        let journal = store.journal_for("sessions", id);
        store.delete("sessions", id).await.unwrap();

        // Assert
        assert_eq!(journal.len(), JOURNAL_CAPACITY);
        assert_eq!(journal[0].sequence_number, 11);
        assert!(store.journal_for("sessions", id).is_empty());
    }
}
