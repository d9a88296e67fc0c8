//! Routes for the Session context: setup, slots, play, and lifecycle.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use taleweaver_character::{CharacterStats, Demographics};
use taleweaver_core::command::Command;
use taleweaver_narrative::{Classification, Intent};
use taleweaver_session::SessionCommandResult;
use taleweaver_session::application::command_handlers;
use taleweaver_session::application::pipeline::{self, SubmissionOutcome, SubmissionResult};
use taleweaver_session::application::query_handlers::{self, SessionSummary, SessionView};
use taleweaver_session::domain::commands;
use taleweaver_session::domain::lifecycle::{PauseReason, SetupStep};
use taleweaver_session::domain::message::Message;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Free-text setting description.
    pub setting: String,
    /// Whether players join with their own identities.
    #[serde(default)]
    pub multiplayer: bool,
}

/// Request body for POST /{id}/advance-step.
#[derive(Debug, Deserialize)]
pub struct AdvanceStepRequest {
    /// Step to move to.
    pub to: SetupStep,
}

/// Request body for POST /{id}/characters.
#[derive(Debug, Deserialize)]
pub struct AddCharacterRequest {
    /// Character name.
    pub name: String,
    /// Character description.
    #[serde(default)]
    pub description: String,
    /// High concept aspect.
    #[serde(default)]
    pub aspect: String,
    /// Archetype or class.
    pub archetype: Option<String>,
    /// Player display name, for hot-seat play.
    pub player_name: Option<String>,
    /// Demographic details.
    #[serde(default)]
    pub demographics: Demographics,
    /// Skills and stunts.
    #[serde(default)]
    pub stats: CharacterStats,
}

/// Request body for POST /{id}/input.
#[derive(Debug, Deserialize)]
pub struct SubmitInputRequest {
    /// What the player typed.
    pub text: String,
    /// Character acting; defaults to the caller's.
    pub character_id: Option<Uuid>,
    /// Set when resubmitting an action the player confirmed.
    #[serde(default)]
    pub confirmed: bool,
}

/// Request body for POST /{id}/slots/{character_id}/claim.
#[derive(Debug, Default, Deserialize)]
pub struct ClaimSlotRequest {
    /// Name shown next to the character.
    pub player_name: Option<String>,
}

/// Request body for POST /{id}/pause.
#[derive(Debug, Deserialize)]
pub struct PauseRequest {
    /// Why play stopped.
    pub reason: PauseReason,
}

/// Request body for PUT /{id}/idle-policy.
#[derive(Debug, Deserialize)]
pub struct IdlePolicyRequest {
    /// Whether idle sessions pause automatically.
    pub auto_end_enabled: bool,
    /// Minutes before an automatic pause.
    pub idle_timeout_minutes: u32,
}

/// Query string for GET /{id}/messages.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// Only the narrative log, without system and question traffic.
    #[serde(default)]
    pub story_only: bool,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The session the command applied to.
    pub session_id: Uuid,
    /// Session document version afterwards.
    pub version: i64,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

impl From<SessionCommandResult> for CommandResponse {
    fn from(result: SessionCommandResult) -> Self {
        Self {
            session_id: result.session_id,
            version: result.version,
            event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
        }
    }
}

/// Response body for POST /{id}/input.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    /// The session the input applied to.
    pub session_id: Uuid,
    /// Session document version afterwards.
    pub version: i64,
    /// How the input was classified.
    pub intent: Classification<Intent>,
    /// What happened.
    pub outcome: SubmissionOutcome,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

impl From<SubmissionResult> for SubmissionResponse {
    fn from(result: SubmissionResult) -> Self {
        Self {
            session_id: result.session_id,
            version: result.version,
            event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
            intent: result.intent,
            outcome: result.outcome,
        }
    }
}

type CommandResult = Result<Json<CommandResponse>, ApiError>;

fn log_command(command: &impl Command) {
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        issued_by = %command.issued_by(),
        "handling command"
    );
    debug!(?command, "command details");
}

/// POST /
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn create_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::CreateSession {
        correlation_id: Uuid::new_v4(),
        session_id: Uuid::new_v4(),
        owner_id: user.0,
        multiplayer: request.multiplayer,
        setting: request.setting,
    };

    log_command(&command);

    let result = command_handlers::handle_create_session(&command, &state.sessions).await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// GET /
#[instrument(skip(state), fields(user_id = %user.0))]
async fn list_sessions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let summaries = query_handlers::list_sessions(&user.0, &state.sessions).await?;
    Ok(Json(summaries))
}

/// GET /{session_id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = query_handlers::get_session(session_id, &state.sessions).await?;
    Ok(Json(view))
}

/// GET /{session_id}/messages
#[instrument(skip(state))]
async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages =
        query_handlers::get_messages(session_id, query.story_only, &state.sessions).await?;
    Ok(Json(messages))
}

/// DELETE /{session_id}
#[instrument(skip(state), fields(user_id = %user.0))]
async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteSession {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
    };

    log_command(&command);

    command_handlers::handle_delete_session(&command, &state.sessions).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{session_id}/advance-step
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn advance_step(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<AdvanceStepRequest>,
) -> CommandResult {
    let command = commands::AdvanceStep {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        to: request.to,
    };

    log_command(&command);

    let result = command_handlers::handle_advance_step(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/characters
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn add_character(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<AddCharacterRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::AddCharacter {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        name: request.name,
        description: request.description,
        aspect: request.aspect,
        archetype: request.archetype,
        player_name: request.player_name,
        demographics: request.demographics,
        stats: request.stats,
    };

    log_command(&command);

    let result = command_handlers::handle_add_character(&command, &state.sessions).await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// POST /{session_id}/begin-play
#[instrument(skip(state), fields(user_id = %user.0))]
async fn begin_play(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
) -> CommandResult {
    let command = commands::BeginPlay {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
    };

    log_command(&command);

    let result = command_handlers::handle_begin_play(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/input
///
/// Cancelling a pending confirmation needs no call; the client simply
/// does not resubmit.
#[instrument(skip(state, request), fields(user_id = %user.0, confirmed = request.confirmed))]
async fn submit_input(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<SubmitInputRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let command = commands::SubmitInput {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        character_id: request.character_id,
        text: request.text,
        confirmed: request.confirmed,
    };

    log_command(&command);

    let result = pipeline::handle_submit_input(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/slots/{character_id}/claim
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn claim_slot(
    State(state): State<AppState>,
    Path((session_id, character_id)): Path<(Uuid, Uuid)>,
    user: CurrentUser,
    request: Option<Json<ClaimSlotRequest>>,
) -> CommandResult {
    let Json(request) = request.unwrap_or_default();
    let command = commands::ClaimSlot {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        character_id,
        player_name: request.player_name,
    };

    log_command(&command);

    let result = command_handlers::handle_claim_slot(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/slots/{character_id}/kick
#[instrument(skip(state), fields(user_id = %user.0))]
async fn kick_slot(
    State(state): State<AppState>,
    Path((session_id, character_id)): Path<(Uuid, Uuid)>,
    user: CurrentUser,
) -> CommandResult {
    let command = commands::KickSlot {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        character_id,
    };

    log_command(&command);

    let result = command_handlers::handle_kick_slot(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/slots/{character_id}/release
#[instrument(skip(state), fields(user_id = %user.0))]
async fn release_slot(
    State(state): State<AppState>,
    Path((session_id, character_id)): Path<(Uuid, Uuid)>,
    user: CurrentUser,
) -> CommandResult {
    let command = commands::ReleaseSlot {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        character_id,
    };

    log_command(&command);

    let result = command_handlers::handle_release_slot(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/acknowledge-handoff
#[instrument(skip(state), fields(user_id = %user.0))]
async fn acknowledge_handoff(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
) -> CommandResult {
    let command = commands::AcknowledgeHandoff {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
    };

    log_command(&command);

    let result = command_handlers::handle_acknowledge_handoff(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/pause
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn pause(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<PauseRequest>,
) -> CommandResult {
    let command = commands::PauseSession {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        reason: request.reason,
    };

    log_command(&command);

    let result = command_handlers::handle_pause(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/next-session
#[instrument(skip(state), fields(user_id = %user.0))]
async fn start_next_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
) -> CommandResult {
    let command = commands::StartNextSession {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
    };

    log_command(&command);

    let result = command_handlers::handle_start_next_session(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/finish
#[instrument(skip(state), fields(user_id = %user.0))]
async fn finish(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
) -> CommandResult {
    let command = commands::FinishSession {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
    };

    log_command(&command);

    let result = command_handlers::handle_finish(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// PUT /{session_id}/idle-policy
#[instrument(skip(state, request), fields(user_id = %user.0))]
async fn set_idle_policy(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<IdlePolicyRequest>,
) -> CommandResult {
    let command = commands::SetIdlePolicy {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
        auto_end_enabled: request.auto_end_enabled,
        idle_timeout_minutes: request.idle_timeout_minutes,
    };

    log_command(&command);

    let result = command_handlers::handle_set_idle_policy(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// POST /{session_id}/undo
#[instrument(skip(state), fields(user_id = %user.0))]
async fn undo(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    user: CurrentUser,
) -> CommandResult {
    let command = commands::UndoLastAction {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: user.0,
    };

    log_command(&command);

    let result = command_handlers::handle_undo(&command, &state.sessions).await?;
    Ok(Json(result.into()))
}

/// Returns the router for the session context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session).get(list_sessions))
        .route("/{session_id}", get(get_session).delete(delete_session))
        .route("/{session_id}/messages", get(get_messages))
        .route("/{session_id}/advance-step", post(advance_step))
        .route("/{session_id}/characters", post(add_character))
        .route("/{session_id}/begin-play", post(begin_play))
        .route("/{session_id}/input", post(submit_input))
        .route("/{session_id}/slots/{character_id}/claim", post(claim_slot))
        .route("/{session_id}/slots/{character_id}/kick", post(kick_slot))
        .route("/{session_id}/slots/{character_id}/release", post(release_slot))
        .route("/{session_id}/acknowledge-handoff", post(acknowledge_handoff))
        .route("/{session_id}/pause", post(pause))
        .route("/{session_id}/next-session", post(start_next_session))
        .route("/{session_id}/finish", post(finish))
        .route("/{session_id}/idle-policy", put(set_idle_policy))
        .route("/{session_id}/undo", post(undo))
}
