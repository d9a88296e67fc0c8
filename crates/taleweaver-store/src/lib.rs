//! Taleweaver document stores.
//!
//! [`memory::InMemoryDocumentStore`] backs tests and single-node deployments;
//! [`pg_document_store::PgDocumentStore`] persists to PostgreSQL. Both publish
//! committed writes through a shared [`hub::SubscriptionHub`].

pub mod hub;
pub mod memory;
pub mod pg_document_store;
pub mod schema;
