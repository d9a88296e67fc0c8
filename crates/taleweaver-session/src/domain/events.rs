//! Domain events for the Session context.
//!
//! Events are journaled with the session document on every successful write
//! and broadcast to subscribers of that session.

use serde::{Deserialize, Serialize};
use taleweaver_core::event::{DomainEvent, EventMetadata};
use taleweaver_core::identity::UserId;
use taleweaver_world_state::SettingCategory;
use uuid::Uuid;

use super::lifecycle::{PauseReason, SetupStep};

/// Event type identifier for [`SessionEventKind::SessionCreated`].
pub const SESSION_CREATED_EVENT_TYPE: &str = "session.created";
/// Event type identifier for [`SessionEventKind::StepAdvanced`].
pub const STEP_ADVANCED_EVENT_TYPE: &str = "session.step_advanced";
/// Event type identifier for [`SessionEventKind::CharacterAdded`].
pub const CHARACTER_ADDED_EVENT_TYPE: &str = "session.character_added";
/// Event type identifier for [`SessionEventKind::CampaignMirrored`].
pub const CAMPAIGN_MIRRORED_EVENT_TYPE: &str = "session.campaign_mirrored";
/// Event type identifier for [`SessionEventKind::PlayBegan`].
pub const PLAY_BEGAN_EVENT_TYPE: &str = "session.play_began";
/// Event type identifier for [`SessionEventKind::SlotClaimed`].
pub const SLOT_CLAIMED_EVENT_TYPE: &str = "session.slot_claimed";
/// Event type identifier for [`SessionEventKind::SlotReleased`].
pub const SLOT_RELEASED_EVENT_TYPE: &str = "session.slot_released";
/// Event type identifier for [`SessionEventKind::QuestionAnswered`].
pub const QUESTION_ANSWERED_EVENT_TYPE: &str = "session.question_answered";
/// Event type identifier for [`SessionEventKind::ActionCommitted`].
pub const ACTION_COMMITTED_EVENT_TYPE: &str = "session.action_committed";
/// Event type identifier for [`SessionEventKind::TurnAdvanced`].
pub const TURN_ADVANCED_EVENT_TYPE: &str = "session.turn_advanced";
/// Event type identifier for [`SessionEventKind::HandoffAcknowledged`].
pub const HANDOFF_ACKNOWLEDGED_EVENT_TYPE: &str = "session.handoff_acknowledged";
/// Event type identifier for [`SessionEventKind::ActionUndone`].
pub const ACTION_UNDONE_EVENT_TYPE: &str = "session.action_undone";
/// Event type identifier for [`SessionEventKind::Paused`].
pub const PAUSED_EVENT_TYPE: &str = "session.paused";
/// Event type identifier for [`SessionEventKind::IdleWarningRaised`].
pub const IDLE_WARNING_RAISED_EVENT_TYPE: &str = "session.idle_warning_raised";
/// Event type identifier for [`SessionEventKind::IdlePolicyChanged`].
pub const IDLE_POLICY_CHANGED_EVENT_TYPE: &str = "session.idle_policy_changed";
/// Event type identifier for [`SessionEventKind::NextSessionStarted`].
pub const NEXT_SESSION_STARTED_EVENT_TYPE: &str = "session.next_session_started";
/// Event type identifier for [`SessionEventKind::Finished`].
pub const FINISHED_EVENT_TYPE: &str = "session.finished";
/// Event type identifier for [`SessionEventKind::ClimaxReady`].
pub const CLIMAX_READY_EVENT_TYPE: &str = "session.climax_ready";

/// Event payload variants for the Session context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventKind {
    /// A session was created.
    SessionCreated {
        /// Owner.
        owner_id: UserId,
        /// Whether players join with their own identities.
        multiplayer: bool,
        /// Classified genre of the setting.
        setting_category: SettingCategory,
    },
    /// The setup flow moved forward.
    StepAdvanced {
        /// Previous step.
        from: SetupStep,
        /// New step.
        to: SetupStep,
    },
    /// A character slot was created.
    CharacterAdded {
        /// New character.
        character_id: Uuid,
        /// Character name.
        name: String,
    },
    /// A (re)generated campaign was mirrored into the world state.
    CampaignMirrored {
        /// Nodes in the campaign graph.
        node_count: usize,
        /// Node the scene is on afterwards, if play has begun.
        scene_node: Option<String>,
    },
    /// Play began on the starting node.
    PlayBegan {
        /// Starting node id.
        starting_node: String,
        /// First active character.
        first_character: Uuid,
    },
    /// A user took a character slot.
    SlotClaimed {
        /// Slot.
        character_id: Uuid,
        /// New holder.
        user_id: UserId,
    },
    /// A slot was emptied.
    SlotReleased {
        /// Slot.
        character_id: Uuid,
        /// Previous holder.
        user_id: UserId,
        /// Whether the host removed the player.
        kicked: bool,
    },
    /// A question was answered without consuming the turn.
    QuestionAnswered {
        /// Asking character, if one was bound.
        character_id: Option<Uuid>,
    },
    /// An action was resolved and merged into the world.
    ActionCommitted {
        /// Acting character.
        character_id: Uuid,
        /// Turn counter after the commit.
        turn_number: u64,
        /// Event recorded in the world, if any.
        event: Option<String>,
        /// Node the party moved to, if any.
        entered_node: Option<String>,
        /// Scene change the campaign graph rejected, if any.
        rejected_scene: Option<String>,
        /// Factions whose clocks filled.
        filled_clocks: Vec<String>,
        /// Victory conditions achieved.
        achieved_conditions: Vec<String>,
    },
    /// The turn moved to another character.
    TurnAdvanced {
        /// Previous character.
        from: Uuid,
        /// Next character.
        to: Uuid,
        /// Whether the device must be handed over first.
        handoff_required: bool,
    },
    /// The next player took over the device.
    HandoffAcknowledged {
        /// Character now active.
        character_id: Uuid,
    },
    /// The last committed action was rolled back.
    ActionUndone {
        /// Turn counter after the undo.
        turn_number: u64,
        /// Messages dropped from the chat log.
        removed_messages: usize,
    },
    /// The session was paused.
    Paused {
        /// Why.
        reason: PauseReason,
    },
    /// The idle warning was raised.
    IdleWarningRaised {
        /// Minutes since the last activity.
        idle_minutes: i64,
    },
    /// Idle settings changed.
    IdlePolicyChanged {
        /// Whether idle sessions pause automatically.
        auto_end_enabled: bool,
        /// Minutes before an automatic pause.
        idle_timeout_minutes: u32,
    },
    /// A new session of the campaign began.
    NextSessionStarted {
        /// One-based session number.
        session_number: u32,
        /// Planned beats.
        beat_count: usize,
    },
    /// The campaign ended.
    Finished,
    /// Every victory condition is met.
    ClimaxReady,
}

impl SessionEventKind {
    /// Dotted type name of this kind of event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEventKind::SessionCreated { .. } => SESSION_CREATED_EVENT_TYPE,
            SessionEventKind::StepAdvanced { .. } => STEP_ADVANCED_EVENT_TYPE,
            SessionEventKind::CharacterAdded { .. } => CHARACTER_ADDED_EVENT_TYPE,
            SessionEventKind::CampaignMirrored { .. } => CAMPAIGN_MIRRORED_EVENT_TYPE,
            SessionEventKind::PlayBegan { .. } => PLAY_BEGAN_EVENT_TYPE,
            SessionEventKind::SlotClaimed { .. } => SLOT_CLAIMED_EVENT_TYPE,
            SessionEventKind::SlotReleased { .. } => SLOT_RELEASED_EVENT_TYPE,
            SessionEventKind::QuestionAnswered { .. } => QUESTION_ANSWERED_EVENT_TYPE,
            SessionEventKind::ActionCommitted { .. } => ACTION_COMMITTED_EVENT_TYPE,
            SessionEventKind::TurnAdvanced { .. } => TURN_ADVANCED_EVENT_TYPE,
            SessionEventKind::HandoffAcknowledged { .. } => HANDOFF_ACKNOWLEDGED_EVENT_TYPE,
            SessionEventKind::ActionUndone { .. } => ACTION_UNDONE_EVENT_TYPE,
            SessionEventKind::Paused { .. } => PAUSED_EVENT_TYPE,
            SessionEventKind::IdleWarningRaised { .. } => IDLE_WARNING_RAISED_EVENT_TYPE,
            SessionEventKind::IdlePolicyChanged { .. } => IDLE_POLICY_CHANGED_EVENT_TYPE,
            SessionEventKind::NextSessionStarted { .. } => NEXT_SESSION_STARTED_EVENT_TYPE,
            SessionEventKind::Finished => FINISHED_EVENT_TYPE,
            SessionEventKind::ClimaxReady => CLIMAX_READY_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Session context.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SessionEventKind,
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("SessionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
