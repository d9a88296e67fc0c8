//! Commands for the Session context.

use taleweaver_character::{CharacterStats, Demographics};
use taleweaver_core::command::Command;
use taleweaver_core::identity::UserId;
use uuid::Uuid;

use super::lifecycle::{PauseReason, SetupStep};

macro_rules! session_command {
    ($ty:ident, $name:literal) => {
        session_command!($ty, $name, user_id);
    };
    ($ty:ident, $name:literal, $user:ident) => {
        impl Command for $ty {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn aggregate_id(&self) -> Uuid {
                self.session_id
            }

            fn issued_by(&self) -> &UserId {
                &self.$user
            }
        }
    };
}

/// Command to create a new session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier for the new session.
    pub session_id: Uuid,
    /// Owning user; the host in multiplayer.
    pub owner_id: UserId,
    /// Whether players join with their own identities.
    pub multiplayer: bool,
    /// Free-text setting description.
    pub setting: String,
}

session_command!(CreateSession, "session.create", owner_id);

/// Command to move the setup flow to the next step.
#[derive(Debug, Clone)]
pub struct AdvanceStep {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user.
    pub user_id: UserId,
    /// Step to move to.
    pub to: SetupStep,
}

session_command!(AdvanceStep, "session.advance_step");

/// Command to create a character slot.
#[derive(Debug, Clone)]
pub struct AddCharacter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user.
    pub user_id: UserId,
    /// Character name.
    pub name: String,
    /// Character description.
    pub description: String,
    /// High concept aspect.
    pub aspect: String,
    /// Archetype or class.
    pub archetype: Option<String>,
    /// Player display name, for hot-seat play.
    pub player_name: Option<String>,
    /// Demographic details.
    pub demographics: Demographics,
    /// Skills and stunts.
    pub stats: CharacterStats,
}

session_command!(AddCharacter, "session.add_character");

/// Command to (re)generate the campaign structure.
#[derive(Debug, Clone)]
pub struct GenerateCampaign {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user.
    pub user_id: UserId,
}

session_command!(GenerateCampaign, "session.generate_campaign");

/// Command to leave setup and start playing.
#[derive(Debug, Clone)]
pub struct BeginPlay {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user.
    pub user_id: UserId,
}

session_command!(BeginPlay, "session.begin_play");

/// Command carrying free-text player input.
#[derive(Debug, Clone)]
pub struct SubmitInput {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Submitting user.
    pub user_id: UserId,
    /// Character the input is for; defaults to the active (hot-seat) or
    /// claimed (multiplayer) character.
    pub character_id: Option<Uuid>,
    /// What the player typed.
    pub text: String,
    /// Whether the player already confirmed a flagged action.
    pub confirmed: bool,
}

session_command!(SubmitInput, "session.submit_input");

/// Command to bind a user to a character slot.
#[derive(Debug, Clone)]
pub struct ClaimSlot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Claiming user.
    pub user_id: UserId,
    /// Slot to claim.
    pub character_id: Uuid,
    /// Name shown next to the character.
    pub player_name: Option<String>,
}

session_command!(ClaimSlot, "session.claim_slot");

/// Command for the host to remove a player from a slot.
#[derive(Debug, Clone)]
pub struct KickSlot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user; must be the host.
    pub user_id: UserId,
    /// Slot to empty.
    pub character_id: Uuid,
}

session_command!(KickSlot, "session.kick_slot");

/// Command for a player to give up their own slot.
#[derive(Debug, Clone)]
pub struct ReleaseSlot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Releasing user.
    pub user_id: UserId,
    /// Slot to release.
    pub character_id: Uuid,
}

session_command!(ReleaseSlot, "session.release_slot");

/// Command confirming the hot-seat device was handed over.
#[derive(Debug, Clone)]
pub struct AcknowledgeHandoff {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user.
    pub user_id: UserId,
}

session_command!(AcknowledgeHandoff, "session.acknowledge_handoff");

/// Command to pause the session.
#[derive(Debug, Clone)]
pub struct PauseSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user.
    pub user_id: UserId,
    /// Why play stopped.
    pub reason: PauseReason,
}

session_command!(PauseSession, "session.pause");

/// Command to start the next session of the campaign.
#[derive(Debug, Clone)]
pub struct StartNextSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user; must be the host.
    pub user_id: UserId,
}

session_command!(StartNextSession, "session.start_next_session");

/// Command to end the campaign.
#[derive(Debug, Clone)]
pub struct FinishSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user; must be the host.
    pub user_id: UserId,
}

session_command!(FinishSession, "session.finish");

/// Command to change idle handling.
#[derive(Debug, Clone)]
pub struct SetIdlePolicy {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user; must be the host.
    pub user_id: UserId,
    /// Whether idle sessions pause automatically.
    pub auto_end_enabled: bool,
    /// Minutes before an automatic pause.
    pub idle_timeout_minutes: u32,
}

session_command!(SetIdlePolicy, "session.set_idle_policy");

/// Command to roll back the last committed action.
#[derive(Debug, Clone)]
pub struct UndoLastAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user; must be the host.
    pub user_id: UserId,
}

session_command!(UndoLastAction, "session.undo");

/// Command to delete a session and its campaign.
#[derive(Debug, Clone)]
pub struct DeleteSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Target session.
    pub session_id: Uuid,
    /// Requesting user; must be the owner.
    pub user_id: UserId,
}

session_command!(DeleteSession, "session.delete");
