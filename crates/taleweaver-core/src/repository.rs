//! Document repository abstraction.
//!
//! Every aggregate is persisted as one JSON document per id within a named
//! collection. Writes are compare-and-swap on the document version, which is
//! the only serialization point between concurrent writers of the same
//! document. Events recorded alongside a write are journaled and fanned out
//! to live subscribers after the write commits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// Stored representation of a domain event.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate's history.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Converts a domain event into its stored representation.
    pub fn from_domain_event<E: DomainEvent + ?Sized>(event: &E) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
        }
    }
}

/// A document as read from the store.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// Collection the document lives in.
    pub collection: String,
    /// Document identifier.
    pub id: Uuid,
    /// Version of the stored body. Starts at 1 on creation.
    pub version: i64,
    /// Serialized aggregate.
    pub body: serde_json::Value,
    /// Timestamp of the last successful write.
    pub updated_at: DateTime<Utc>,
}

/// Notification published to subscribers after a committed write.
#[derive(Debug, Clone)]
pub struct DocumentChanged {
    /// Collection the document lives in.
    pub collection: String,
    /// Document identifier.
    pub id: Uuid,
    /// Version produced by the write. Zero signals deletion.
    pub version: i64,
    /// Events recorded with the write.
    pub events: Vec<StoredEvent>,
}

/// Repository trait for versioned JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read. Returns `None` when the document does not exist.
    async fn load(&self, collection: &str, id: Uuid)
    -> Result<Option<StoredDocument>, DomainError>;

    /// Lists the ids of every document in a collection.
    async fn list_ids(&self, collection: &str) -> Result<Vec<Uuid>, DomainError>;

    /// Compare-and-swap write.
    ///
    /// `expected_version` is the version the caller read; `0` means the
    /// document must not exist yet. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::VersionConflict` when the stored version
    /// differs from `expected_version`.
    async fn save(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        body: serde_json::Value,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError>;

    /// Removes a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), DomainError>;

    /// Subscribes to committed writes of one document.
    fn subscribe(&self, collection: &str, id: Uuid) -> broadcast::Receiver<DocumentChanged>;
}
