//! Domain events recorded by aggregates and journaled with each write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Dotted type name, e.g. `session.turn_advanced`.
    pub event_type: String,
    /// Document the event was recorded on.
    pub aggregate_id: Uuid,
    /// Position in the document's event history, starting at 1.
    pub sequence_number: i64,
    /// Id of the request that produced the event.
    pub correlation_id: Uuid,
    /// Id of the command or event that directly caused this one.
    pub causation_id: Uuid,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Metadata for an event caused directly by the request `correlation_id`.
    #[must_use]
    pub fn caused_by_request(
        event_type: &str,
        aggregate_id: Uuid,
        sequence_number: i64,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            aggregate_id,
            sequence_number,
            correlation_id,
            causation_id: correlation_id,
            occurred_at,
        }
    }
}

/// An event an aggregate records while handling a command.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Dotted type name used by subscribers to route the event.
    fn event_type(&self) -> &'static str;

    /// Event-specific payload as JSON.
    fn to_payload(&self) -> serde_json::Value;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}
