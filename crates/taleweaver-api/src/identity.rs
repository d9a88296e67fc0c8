//! Caller identity.
//!
//! Authentication lives in front of this service; the gateway forwards the
//! authenticated user in the `x-user-id` header.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use taleweaver_core::identity::UserId;

use crate::error::ErrorBody;

/// Header carrying the authenticated user.
pub const USER_HEADER: &str = "x-user-id";

/// The user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

/// Rejection for requests without a usable user header.
#[derive(Debug)]
pub struct MissingUser;

impl IntoResponse for MissingUser {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: "missing_user",
            message: format!("the {USER_HEADER} header is required"),
            retryable: false,
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = MissingUser;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| Self(UserId::from(raw)))
            .ok_or(MissingUser)
    }
}
