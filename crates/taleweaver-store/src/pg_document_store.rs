//! `PostgreSQL` implementation of the `DocumentStore` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use uuid::Uuid;

use taleweaver_core::error::DomainError;
use taleweaver_core::repository::{DocumentChanged, DocumentStore, StoredDocument, StoredEvent};

use crate::hub::SubscriptionHub;

/// PostgreSQL-backed document store.
///
/// Change notifications are delivered in-process only; subscribers attached
/// to another server instance see writes on their next read.
#[derive(Debug)]
pub struct PgDocumentStore {
    pool: PgPool,
    hub: SubscriptionHub,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            hub: SubscriptionHub::default(),
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn row_to_document(row: &PgRow) -> Result<StoredDocument, DomainError> {
    Ok(StoredDocument {
        collection: row.try_get("collection").map_err(infrastructure)?,
        id: row.try_get("id").map_err(infrastructure)?,
        version: row.try_get("version").map_err(infrastructure)?,
        body: row.try_get("body").map_err(infrastructure)?,
        updated_at: row.try_get("updated_at").map_err(infrastructure)?,
    })
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[instrument(skip(self))]
    async fn load(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, DomainError> {
        let row = sqlx::query(
            "SELECT collection, id, version, body, updated_at \
             FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<Uuid>, DomainError> {
        let rows = sqlx::query("SELECT id FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        rows.iter()
            .map(|row| row.try_get::<Uuid, _>("id").map_err(infrastructure))
            .collect()
    }

    #[instrument(skip(self, body, events), fields(event_count = events.len()))]
    async fn save(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        body: serde_json::Value,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let written = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO documents (collection, id, version, body, updated_at) \
                 VALUES ($1, $2, 1, $3, NOW()) \
                 ON CONFLICT (collection, id) DO NOTHING",
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?
        } else {
            sqlx::query(
                "UPDATE documents SET body = $3, version = version + 1, updated_at = NOW() \
                 WHERE collection = $1 AND id = $2 AND version = $4",
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .bind(expected_version)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?
        };

        if written.rows_affected() == 0 {
            let actual: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents WHERE collection = $1 AND id = $2",
            )
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(infrastructure)?;
            tx.rollback().await.map_err(infrastructure)?;
            debug!(expected_version, ?actual, "rejecting stale write");
            return Err(DomainError::VersionConflict {
                collection: collection.to_owned(),
                id,
                expected: expected_version,
                actual: actual.unwrap_or(0),
            });
        }

        let new_version = expected_version + 1;
        for event in events {
            sqlx::query(
                "INSERT INTO document_events \
                 (event_id, collection, aggregate_id, document_version, event_type, payload, \
                  sequence_number, correlation_id, causation_id, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(event.event_id)
            .bind(collection)
            .bind(event.aggregate_id)
            .bind(new_version)
            .bind(&event.event_type)
            .bind(event.payload.clone())
            .bind(event.sequence_number)
            .bind(event.correlation_id)
            .bind(event.causation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;
        }

        tx.commit().await.map_err(infrastructure)?;

        self.hub.publish(DocumentChanged {
            collection: collection.to_owned(),
            id,
            version: new_version,
            events: events.to_vec(),
        });

        Ok(new_version)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), DomainError> {
        let deleted = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;

        if deleted.rows_affected() > 0 {
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
