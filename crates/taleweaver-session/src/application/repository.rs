//! Typed access to the session and campaign documents.
//!
//! The store is the only serialization point between concurrent writers:
//! every write is a compare-and-swap on the version the writer loaded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taleweaver_campaign::CampaignStructure;
use taleweaver_core::aggregate::AggregateRoot;
use taleweaver_core::repository::{DocumentChanged, DocumentStore, StoredEvent};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::GameSession;
use crate::error::SessionError;

/// Collection holding `GameSession` documents.
pub const SESSIONS: &str = <GameSession as AggregateRoot>::COLLECTION;

/// Collection holding campaign documents, keyed by session id.
pub const CAMPAIGNS: &str = "campaigns";

/// Outcome of a successful read-modify-write.
#[derive(Debug)]
pub struct Mutation<T> {
    /// The session as written.
    pub session: GameSession,
    /// Whatever the mutation returned.
    pub output: T,
    /// Events committed with the write. Empty when nothing changed.
    pub events: Vec<StoredEvent>,
}

/// Repository for `GameSession` documents.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn DocumentStore>,
    retry_limit: u32,
}

impl std::fmt::Debug for SessionRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRepository")
            .field("retry_limit", &self.retry_limit)
            .finish_non_exhaustive()
    }
}

impl SessionRepository {
    /// Creates a repository that retries conflicting writes `retry_limit`
    /// times.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, retry_limit: u32) -> Self {
        Self { store, retry_limit }
    }

    /// Loads a session.
    ///
    /// # Errors
    ///
    /// `NotFound` when absent, `Storage` when the store or the document is
    /// broken.
    pub async fn load(&self, id: Uuid) -> Result<GameSession, SessionError> {
        let document = self
            .store
            .load(SESSIONS, id)
            .await?
            .ok_or(SessionError::NotFound(id))?;
        let mut session: GameSession = serde_json::from_value(document.body)
            .map_err(|e| SessionError::Storage(format!("session deserialization failed: {e}")))?;
        session.set_version(document.version);
        Ok(session)
    }

    /// Writes a new session.
    ///
    /// # Errors
    ///
    /// `Conflict` if the id is taken.
    pub async fn create(
        &self,
        session: &mut GameSession,
    ) -> Result<Vec<StoredEvent>, SessionError> {
        self.save(session).await
    }

    async fn save(&self, session: &mut GameSession) -> Result<Vec<StoredEvent>, SessionError> {
        let events = session.pending_stored_events();
        let body = serde_json::to_value(&*session)
            .map_err(|e| SessionError::Storage(format!("session serialization failed: {e}")))?;
        let version = self
            .store
            .save(SESSIONS, session.id, session.version(), body, &events)
            .await?;
        session.set_version(version);
        session.clear_uncommitted_events();
        Ok(events)
    }

    /// Loads the session, applies `change`, and writes it back.
    ///
    /// On a version conflict the whole cycle runs again against the fresh
    /// document, up to the retry limit, so `change` must re-validate
    /// everything it relies on. A `change` that records no events writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Whatever `change` returns, `Conflict` once retries are exhausted, or
    /// a load/save failure.
    pub async fn mutate<T, F>(&self, id: Uuid, mut change: F) -> Result<Mutation<T>, SessionError>
    where
        F: FnMut(&mut GameSession) -> Result<T, SessionError> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            let mut session = self.load(id).await?;
            let output = change(&mut session)?;
            if session.uncommitted_events().is_empty() {
                return Ok(Mutation {
                    session,
                    output,
                    events: Vec::new(),
                });
            }
            match self.save(&mut session).await {
                Ok(events) => {
                    return Ok(Mutation {
                        session,
                        output,
                        events,
                    });
                }
                Err(SessionError::Conflict) if attempt < self.retry_limit => {
                    attempt += 1;
                    debug!(session_id = %id, attempt, "version conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Removes a session document.
    ///
    /// # Errors
    ///
    /// `Storage` on store failure.
    pub async fn delete(&self, id: Uuid) -> Result<(), SessionError> {
        self.store.delete(SESSIONS, id).await?;
        Ok(())
    }

    /// Ids of every stored session.
    ///
    /// # Errors
    ///
    /// `Storage` on store failure.
    pub async fn list_ids(&self) -> Result<Vec<Uuid>, SessionError> {
        Ok(self.store.list_ids(SESSIONS).await?)
    }

    /// Live feed of committed writes to one session.
    #[must_use]
    pub fn subscribe(&self, id: Uuid) -> broadcast::Receiver<DocumentChanged> {
        self.store.subscribe(SESSIONS, id)
    }
}

/// The generated campaign of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDocument {
    /// Owning session.
    pub session_id: Uuid,
    /// Generated content.
    pub structure: CampaignStructure,
    /// When it was (re)generated.
    pub generated_at: DateTime<Utc>,
    /// Stored version; zero until first written.
    #[serde(skip)]
    pub version: i64,
}

/// Repository for campaign documents.
#[derive(Clone)]
pub struct CampaignRepository {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for CampaignRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignRepository").finish_non_exhaustive()
    }
}

impl CampaignRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Loads the campaign of a session, if one has been generated.
    ///
    /// # Errors
    ///
    /// `Storage` when the store or the document is broken.
    pub async fn load(&self, session_id: Uuid) -> Result<Option<CampaignDocument>, SessionError> {
        let Some(document) = self.store.load(CAMPAIGNS, session_id).await? else {
            return Ok(None);
        };
        let mut campaign: CampaignDocument = serde_json::from_value(document.body)
            .map_err(|e| SessionError::Storage(format!("campaign deserialization failed: {e}")))?;
        campaign.version = document.version;
        Ok(Some(campaign))
    }

    /// Loads the campaign of a session that must already have one.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when no campaign was generated yet.
    pub async fn require(&self, session_id: Uuid) -> Result<CampaignDocument, SessionError> {
        self.load(session_id).await?.ok_or_else(|| {
            SessionError::InvalidInput("no campaign has been generated for this session".to_owned())
        })
    }

    /// Writes the campaign with compare-and-swap on `campaign.version`.
    ///
    /// # Errors
    ///
    /// `Conflict` when another generation won the race.
    pub async fn save(&self, campaign: &mut CampaignDocument) -> Result<(), SessionError> {
        let body = serde_json::to_value(&*campaign)
            .map_err(|e| SessionError::Storage(format!("campaign serialization failed: {e}")))?;
        campaign.version = self
            .store
            .save(CAMPAIGNS, campaign.session_id, campaign.version, body, &[])
            .await?;
        Ok(())
    }

    /// Removes the campaign of a session.
    ///
    /// # Errors
    ///
    /// `Storage` on store failure.
    pub async fn delete(&self, session_id: Uuid) -> Result<(), SessionError> {
        self.store.delete(CAMPAIGNS, session_id).await?;
        Ok(())
    }
}
