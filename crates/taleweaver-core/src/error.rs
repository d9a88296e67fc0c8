//! Storage errors shared by every bounded context.

use thiserror::Error;
use uuid::Uuid;

/// Failure of a [`DocumentStore`](crate::repository::DocumentStore) call.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A compare-and-swap write found another version than the one its
    /// writer loaded.
    #[error("version conflict on {collection}/{id}: loaded {expected}, stored {actual}")]
    VersionConflict {
        /// Collection of the contested document.
        collection: String,
        /// The contested document.
        id: Uuid,
        /// The version the writer loaded.
        expected: i64,
        /// The version currently stored; zero when the document is gone.
        actual: i64,
    },

    /// The backing store failed or could not be reached.
    #[error("document store failure: {0}")]
    Infrastructure(String),
}
