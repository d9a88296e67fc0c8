//! Query handlers for the Session context.
//!
//! Views leave out the undo snapshot body; only whether one exists is shown.

use chrono::{DateTime, Utc};
use serde::Serialize;
use taleweaver_core::aggregate::AggregateRoot;
use taleweaver_core::identity::UserId;
use taleweaver_world_state::WorldState;
use uuid::Uuid;

use super::context::SessionContext;
use super::repository::CampaignDocument;
use crate::domain::lifecycle::{PauseReason, SessionStatus, SetupStep};
use crate::domain::message::Message;
use crate::domain::turn::{PlayMode, TurnState};
use crate::error::SessionError;

/// Read-only view of a session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Session identifier.
    pub session_id: Uuid,
    /// Owning user.
    pub owner_id: UserId,
    /// Hot-seat or multiplayer.
    pub mode: PlayMode,
    /// Setup step.
    pub step: SetupStep,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Reason for the current pause.
    pub pause_reason: Option<PauseReason>,
    /// Setting description.
    pub setting: String,
    /// Whose turn it is.
    pub turn: TurnState,
    /// Turn counter.
    pub turn_number: u64,
    /// Whether the last action can be undone.
    pub can_undo: bool,
    /// Narrative memory.
    pub world_state: WorldState,
    /// Length of the chat log.
    pub message_count: usize,
    /// Document version, for optimistic clients.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One line in a session listing.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: Uuid,
    /// Setting description.
    pub setting: String,
    /// Setup step.
    pub step: SetupStep,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Whether players join with their own identities.
    pub multiplayer: bool,
    /// Last player activity.
    pub last_activity: DateTime<Utc>,
}

/// Retrieves a session.
///
/// # Errors
///
/// `NotFound` for unknown sessions.
pub async fn get_session(
    session_id: Uuid,
    ctx: &SessionContext,
) -> Result<SessionView, SessionError> {
    let session = ctx.sessions.load(session_id).await?;
    Ok(SessionView {
        session_id: session.id,
        version: session.version(),
        can_undo: session.can_undo(),
        message_count: session.messages.len(),
        owner_id: session.owner_id,
        mode: session.mode,
        step: session.step,
        status: session.status,
        pause_reason: session.pause_reason,
        setting: session.setting,
        turn: session.turn,
        turn_number: session.turn_number,
        world_state: session.world_state,
        created_at: session.created_at,
    })
}

/// Retrieves the chat log, or only the narrative part of it.
///
/// # Errors
///
/// `NotFound` for unknown sessions.
pub async fn get_messages(
    session_id: Uuid,
    story_only: bool,
    ctx: &SessionContext,
) -> Result<Vec<Message>, SessionError> {
    let session = ctx.sessions.load(session_id).await?;
    Ok(if story_only {
        session.story_messages
    } else {
        session.messages
    })
}

/// Retrieves the generated campaign.
///
/// # Errors
///
/// `NotFound` when no campaign was generated for the session.
pub async fn get_campaign(
    session_id: Uuid,
    ctx: &SessionContext,
) -> Result<CampaignDocument, SessionError> {
    ctx.campaigns
        .load(session_id)
        .await?
        .ok_or(SessionError::NotFound(session_id))
}

/// Lists the sessions `user` hosts or holds a slot in.
///
/// # Errors
///
/// Storage failures.
pub async fn list_sessions(
    user: &UserId,
    ctx: &SessionContext,
) -> Result<Vec<SessionSummary>, SessionError> {
    let mut summaries = Vec::new();
    for id in ctx.sessions.list_ids().await? {
        let session = match ctx.sessions.load(id).await {
            Ok(session) => session,
            Err(SessionError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        if !session.is_participant(user) {
            continue;
        }
        summaries.push(SessionSummary {
            session_id: session.id,
            multiplayer: session.mode.is_multiplayer(),
            last_activity: session.world_state.last_activity,
            setting: session.setting,
            step: session.step,
            status: session.status,
        });
    }
    summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    Ok(summaries)
}
