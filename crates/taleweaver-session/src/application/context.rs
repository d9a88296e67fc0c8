//! Everything a session handler needs, bundled once at startup.

use std::sync::Arc;

use taleweaver_core::aggregate::AggregateRoot;
use taleweaver_core::clock::Clock;
use taleweaver_core::repository::{DocumentStore, StoredEvent};
use taleweaver_narrative::{ClassificationGateway, ConsequenceGate, KeywordTable, NarrativeOracle};
use uuid::Uuid;

use super::repository::{CampaignRepository, Mutation, SessionRepository};
use crate::config::PipelineConfig;

/// Shared dependencies of the session handlers.
#[derive(Clone)]
pub struct SessionContext {
    /// Session documents.
    pub sessions: SessionRepository,
    /// Campaign documents.
    pub campaigns: CampaignRepository,
    /// Narration oracle.
    pub oracle: Arc<dyn NarrativeOracle>,
    /// Intent and genre classification.
    pub gateway: Arc<ClassificationGateway>,
    /// Confirmation gate for risky actions.
    pub gate: ConsequenceGate,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Pipeline tunables.
    pub config: PipelineConfig,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("gateway", &self.gateway)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Wires the handlers to a store, an oracle, and a clock. The oracle is
    /// also the classifier; the built-in keyword table is the fallback.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        oracle: Arc<dyn NarrativeOracle>,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        let gateway = gateway_for(&oracle, &KeywordTable::builtin(), &config);
        Self {
            sessions: SessionRepository::new(Arc::clone(&store), config.commit_retry_limit),
            campaigns: CampaignRepository::new(store),
            gate: ConsequenceGate::new(Arc::clone(&oracle)),
            gateway: Arc::new(gateway),
            oracle,
            clock,
            config,
        }
    }

    /// Swaps the fallback keyword table, keeping the oracle and thresholds.
    #[must_use]
    pub fn with_keywords(mut self, table: &KeywordTable) -> Self {
        self.gateway = Arc::new(gateway_for(&self.oracle, table, &self.config));
        self
    }
}

fn gateway_for(
    oracle: &Arc<dyn NarrativeOracle>,
    table: &KeywordTable,
    config: &PipelineConfig,
) -> ClassificationGateway {
    ClassificationGateway::new(Some(Arc::clone(oracle)), table)
        .with_thresholds(config.intent_threshold, config.genre_threshold)
}

/// Result of a successfully handled session command.
#[derive(Debug)]
pub struct SessionCommandResult {
    /// The session affected or created by the command.
    pub session_id: Uuid,
    /// Session document version after the command.
    pub version: i64,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

impl<T> From<Mutation<T>> for SessionCommandResult {
    fn from(mutation: Mutation<T>) -> Self {
        Self {
            session_id: mutation.session.id,
            version: mutation.session.version(),
            stored_events: mutation.events,
        }
    }
}
