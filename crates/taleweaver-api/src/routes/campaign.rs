//! Routes for campaign generation.
//!
//! Generation runs in the background; clients watch the session for the
//! mirrored factions and starting scene, or poll the campaign view.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use taleweaver_session::SessionError;
use taleweaver_session::application::campaign::spawn_campaign_generation;
use taleweaver_session::application::query_handlers;
use taleweaver_session::application::repository::CampaignDocument;
use taleweaver_session::domain::commands;
use taleweaver_session::domain::lifecycle::SessionStatus;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::state::AppState;

/// Response body for an accepted generation request.
#[derive(Debug, Serialize)]
pub struct GenerationAccepted {
    /// The session being generated for.
    pub session_id: Uuid,
    /// Correlation ID to find the generation in the logs.
    pub correlation_id: Uuid,
}

/// POST /{session_id}/campaign
///
/// Host and lifecycle checks run up front so obvious mistakes are reported
/// synchronously; the handler repeats them when the task runs.
#[instrument(skip(state), fields(user_id = %user.0))]
async fn generate_campaign(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
) -> Result<(StatusCode, Json<GenerationAccepted>), ApiError> {
    let session = state.sessions.sessions.load(session_id).await?;
    if !session.is_host(&user.0) {
        return Err(SessionError::Forbidden(
            "only the host may generate the campaign".to_owned(),
        )
        .into());
    }
    if session.status == SessionStatus::Finished {
        return Err(SessionError::SessionFinished.into());
    }

    let command = commands::GenerateCampaign {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
    };

    info!(correlation_id = %command.correlation_id, "scheduling campaign generation");

    let accepted = GenerationAccepted {
        session_id,
        correlation_id: command.correlation_id,
    };
    drop(spawn_campaign_generation(command, state.sessions.clone()));
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// GET /{session_id}/campaign
#[instrument(skip(state))]
async fn get_campaign(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CampaignDocument>, ApiError> {
    let campaign = query_handlers::get_campaign(session_id, &state.sessions).await?;
    Ok(Json(campaign))
}

/// Returns the router for campaign generation.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{session_id}/campaign",
        post(generate_campaign).get(get_campaign),
    )
}
