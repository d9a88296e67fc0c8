//! Oracle error types.

use thiserror::Error;

/// Failures of the external narration/classification oracle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// The backend could not be reached or refused the request.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with output that does not fit the schema.
    #[error("oracle returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The backend answered with nothing usable.
    #[error("oracle returned an empty response")]
    EmptyResponse,
}
