//! Taleweaver: API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use taleweaver_session::{ErrorClass, SessionError};
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Whether the same request may succeed later.
    pub retryable: bool,
}

/// HTTP-layer wrapper around `SessionError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SessionError::Forbidden(_) => StatusCode::FORBIDDEN,
        SessionError::NotFound(_) | SessionError::UnknownCharacter(_) => StatusCode::NOT_FOUND,
        other => match other.class() {
            ErrorClass::ExternalDependency => StatusCode::SERVICE_UNAVAILABLE,
            ErrorClass::Validation | ErrorClass::Conflict | ErrorClass::Terminal => {
                StatusCode::CONFLICT
            }
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::warn!(error = %self.0, code = self.0.code(), "request failed");
        }

        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}
