//! Test stores: mock `DocumentStore` implementations for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use taleweaver_core::error::DomainError;
use taleweaver_core::repository::{DocumentChanged, DocumentStore, StoredDocument, StoredEvent};
use tokio::sync::{Barrier, broadcast};
use uuid::Uuid;

/// A document store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingDocumentStore;

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn load(
        &self,
        _collection: &str,
        _id: Uuid,
    ) -> Result<Option<StoredDocument>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn list_ids(&self, _collection: &str) -> Result<Vec<Uuid>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(
        &self,
        _collection: &str,
        _id: Uuid,
        _expected_version: i64,
        _body: serde_json::Value,
        _events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _collection: &str, _id: Uuid) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    fn subscribe(&self, _collection: &str, _id: Uuid) -> broadcast::Receiver<DocumentChanged> {
        broadcast::channel(1).1
    }
}

/// Wraps a store so the first `parties` saves wait on a shared barrier
/// before writing. Writers that loaded the same version then reach the
/// compare-and-swap together; later saves pass straight through.
pub struct GatedDocumentStore {
    inner: Arc<dyn DocumentStore>,
    barrier: Barrier,
    gated: AtomicUsize,
}

impl GatedDocumentStore {
    /// Gates the next `parties` saves to `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn DocumentStore>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            gated: AtomicUsize::new(parties),
        }
    }
}

#[async_trait]
impl DocumentStore for GatedDocumentStore {
    async fn load(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, DomainError> {
        self.inner.load(collection, id).await
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<Uuid>, DomainError> {
        self.inner.list_ids(collection).await
    }

    async fn save(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        body: serde_json::Value,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        let gated = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        self.inner
            .save(collection, id, expected_version, body, events)
            .await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), DomainError> {
        self.inner.delete(collection, id).await
    }

    fn subscribe(&self, collection: &str, id: Uuid) -> broadcast::Receiver<DocumentChanged> {
        self.inner.subscribe(collection, id)
    }
}
