//! Document store database schema.

/// SQL to create the documents and change journal tables.
///
/// Mirrors `migrations/0001_documents.sql`; kept for bootstrapping databases
/// that are not managed by `sqlx migrate`.
pub const CREATE_DOCUMENT_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    collection  VARCHAR(64) NOT NULL,
    id          UUID NOT NULL,
    version     BIGINT NOT NULL,
    body        JSONB NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
);

CREATE TABLE IF NOT EXISTS document_events (
    event_id        UUID PRIMARY KEY,
    collection      VARCHAR(64) NOT NULL,
    aggregate_id    UUID NOT NULL,
    document_version BIGINT NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    sequence_number BIGINT NOT NULL,
    correlation_id  UUID NOT NULL,
    causation_id    UUID NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_document_events_aggregate_id
    ON document_events (aggregate_id, sequence_number);

CREATE INDEX IF NOT EXISTS idx_document_events_correlation_id
    ON document_events (correlation_id);
";
