//! Error taxonomy for session operations.

use taleweaver_campaign::CampaignError;
use taleweaver_character::CharacterError;
use taleweaver_core::error::DomainError;
use taleweaver_core::identity::UserId;
use taleweaver_narrative::OracleError;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::lifecycle::SetupStep;

/// How an error should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected up front; nothing changed. Correct the state, then retry.
    Validation,
    /// An outside dependency failed; nothing changed. Retry later.
    ExternalDependency,
    /// Lost a compare-and-swap race. Refresh, then retry.
    Conflict,
    /// The request can never succeed against this session.
    Terminal,
}

/// Errors returned by session commands and queries.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The acting character is not the active one.
    #[error("it is not this character's turn")]
    NotYourTurn {
        /// Character whose turn it is.
        active: Option<Uuid>,
        /// Character that tried to act.
        attempted: Option<Uuid>,
    },

    /// Turn progression is frozen.
    #[error("the session is paused")]
    SessionPaused,

    /// The session has ended.
    #[error("the session is finished")]
    SessionFinished,

    /// Another user holds the slot.
    #[error("character {character_id} is already claimed by {claimed_by}")]
    AlreadyClaimed {
        /// Contested character.
        character_id: Uuid,
        /// Current holder.
        claimed_by: UserId,
    },

    /// The user may not perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No such character in the session.
    #[error("unknown character {0}")]
    UnknownCharacter(Uuid),

    /// The device has to be handed to the next player first.
    #[error("waiting for the next player to take over")]
    HandoffPending {
        /// Character up next.
        next: Uuid,
    },

    /// There is no handoff to acknowledge.
    #[error("no handoff is pending")]
    NoPendingHandoff,

    /// The operation belongs to a different setup step.
    #[error("expected step {expected}, session is at {actual}")]
    WrongStep {
        /// Step the operation requires.
        expected: SetupStep,
        /// Step the session is at.
        actual: SetupStep,
    },

    /// Every victory condition is met; no further sessions can start.
    #[error("the campaign is already finished")]
    CampaignAlreadyFinished,

    /// No snapshot to restore.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Another action committed first for this turn.
    #[error("the turn moved on before this action could be committed")]
    StaleTurn,

    /// Concurrent writers kept colliding.
    #[error("the session was modified concurrently")]
    Conflict,

    /// The narration oracle failed.
    #[error("narration is unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),

    /// A generated campaign broke structural invariants.
    #[error(transparent)]
    InvalidCampaign(#[from] CampaignError),

    /// Malformed request.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No such session.
    #[error("session {0} not found")]
    NotFound(Uuid),

    /// The document store failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl SessionError {
    /// How the caller should treat this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotYourTurn { .. }
            | Self::SessionPaused
            | Self::AlreadyClaimed { .. }
            | Self::Forbidden(_)
            | Self::UnknownCharacter(_)
            | Self::HandoffPending { .. }
            | Self::NoPendingHandoff
            | Self::WrongStep { .. }
            | Self::InvalidInput(_) => ErrorClass::Validation,
            Self::OracleUnavailable(_) | Self::InvalidCampaign(_) | Self::Storage(_) => {
                ErrorClass::ExternalDependency
            }
            Self::StaleTurn | Self::Conflict => ErrorClass::Conflict,
            Self::SessionFinished
            | Self::CampaignAlreadyFinished
            | Self::NothingToUndo
            | Self::NotFound(_) => ErrorClass::Terminal,
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::ExternalDependency | ErrorClass::Conflict
        )
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotYourTurn { .. } => "not_your_turn",
            Self::SessionPaused => "session_paused",
            Self::SessionFinished => "session_finished",
            Self::AlreadyClaimed { .. } => "already_claimed",
            Self::Forbidden(_) => "forbidden",
            Self::UnknownCharacter(_) => "unknown_character",
            Self::HandoffPending { .. } => "handoff_pending",
            Self::NoPendingHandoff => "no_pending_handoff",
            Self::WrongStep { .. } => "wrong_step",
            Self::CampaignAlreadyFinished => "campaign_already_finished",
            Self::NothingToUndo => "nothing_to_undo",
            Self::StaleTurn => "stale_turn",
            Self::Conflict => "conflict",
            Self::OracleUnavailable(_) => "oracle_unavailable",
            Self::InvalidCampaign(_) => "invalid_campaign",
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<CharacterError> for SessionError {
    fn from(error: CharacterError) -> Self {
        match error {
            CharacterError::AlreadyClaimed {
                character_id,
                claimed_by,
            } => Self::AlreadyClaimed {
                character_id,
                claimed_by,
            },
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<DomainError> for SessionError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::VersionConflict { .. } => Self::Conflict,
            DomainError::Infrastructure(message) => Self::Storage(message),
        }
    }
}
