//! The `GameSession` aggregate root.
//!
//! Every rule about who may do what, and when, lives here. Application
//! handlers load the aggregate, call one of these methods, and write it back
//! with compare-and-swap; a method that returns an error leaves nothing to
//! persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taleweaver_campaign::CampaignStructure;
use taleweaver_character::Character;
use taleweaver_core::aggregate::AggregateRoot;
use taleweaver_core::clock::Clock;
use taleweaver_core::event::EventMetadata;
use taleweaver_core::identity::UserId;
use taleweaver_narrative::Narration;
use taleweaver_world_state::{Beat, PatchOutcome, SettingCategory, WorldState};
use uuid::Uuid;

use super::events::{SessionEvent, SessionEventKind};
use super::lifecycle::{PauseReason, SessionStatus, SetupStep};
use super::message::{Message, Role};
use super::turn::{PlayMode, TurnState, next_in_rotation};
use crate::error::SessionError;

/// Fewest beats a session plan may have.
pub const MIN_BEATS: usize = 12;

/// Most beats a session plan may have.
pub const MAX_BEATS: usize = 18;

/// Minutes before the idle timeout at which the warning is raised. Short
/// timeouts warn a quarter of the timeout ahead instead.
pub const IDLE_WARNING_LEAD_MINUTES: i64 = 30;

/// State captured before an action is merged, restored by undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// World before the action.
    pub world_state: WorldState,
    /// Turn before the action.
    pub turn: TurnState,
    /// Length of `messages` before the action.
    pub message_count: usize,
    /// Length of `story_messages` before the action.
    pub story_message_count: usize,
}

/// Result of an idle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleCheck {
    /// Nothing to do.
    Unchanged,
    /// The one-time warning was raised.
    Warned,
    /// The session was paused for inactivity.
    Paused,
}

/// The aggregate root for one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: UserId,
    /// How players share the session.
    pub mode: PlayMode,
    /// Setup step.
    pub step: SetupStep,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Reason for the current or last pause.
    pub pause_reason: Option<PauseReason>,
    /// Free-text setting description.
    pub setting: String,
    /// Whose turn it is.
    pub turn: TurnState,
    /// Bumped by every committed action and every undo.
    pub turn_number: u64,
    /// Narrative memory.
    pub world_state: WorldState,
    /// Bumped each time a campaign is mirrored in.
    #[serde(default)]
    pub campaign_revision: u64,
    /// Single-level undo snapshot.
    pub previous: Option<Snapshot>,
    /// Chat log.
    pub messages: Vec<Message>,
    /// Narrative-only log.
    pub story_messages: Vec<Message>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Events recorded over the session's lifetime.
    #[serde(default)]
    event_count: i64,
    /// Document version this aggregate was loaded at.
    #[serde(skip)]
    version: i64,
    /// Uncommitted events pending persistence.
    #[serde(skip)]
    uncommitted_events: Vec<SessionEvent>,
}

impl GameSession {
    /// Creates a session in the `create` step.
    #[must_use]
    pub fn create(
        id: Uuid,
        owner_id: UserId,
        multiplayer: bool,
        setting: impl Into<String>,
        setting_category: SettingCategory,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let now = clock.now();
        let mode = if multiplayer {
            PlayMode::Multiplayer {
                host_id: owner_id.clone(),
            }
        } else {
            PlayMode::HotSeat
        };
        let mut session = Self {
            id,
            owner_id: owner_id.clone(),
            mode,
            step: SetupStep::Create,
            status: SessionStatus::Active,
            pause_reason: None,
            setting: setting.into(),
            turn: TurnState::NotStarted,
            turn_number: 0,
            world_state: WorldState::new(setting_category, now),
            campaign_revision: 0,
            previous: None,
            messages: Vec::new(),
            story_messages: Vec::new(),
            created_at: now,
            event_count: 0,
            version: 0,
            uncommitted_events: Vec::new(),
        };
        session.record(
            SessionEventKind::SessionCreated {
                owner_id,
                multiplayer,
                setting_category,
            },
            correlation_id,
            clock,
        );
        session
    }

    /// User allowed to run the session.
    #[must_use]
    pub fn host_id(&self) -> &UserId {
        match &self.mode {
            PlayMode::HotSeat => &self.owner_id,
            PlayMode::Multiplayer { host_id } => host_id,
        }
    }

    /// Whether `user` is the host.
    #[must_use]
    pub fn is_host(&self, user: &UserId) -> bool {
        self.host_id() == user
    }

    /// Whether `user` is the host or holds a slot.
    #[must_use]
    pub fn is_participant(&self, user: &UserId) -> bool {
        self.is_host(user)
            || self
                .world_state
                .characters
                .iter()
                .any(|c| c.is_claimed_by(user))
    }

    /// Character whose turn it is.
    #[must_use]
    pub fn active_character_id(&self) -> Option<Uuid> {
        self.turn.character_id()
    }

    /// Whether an undo snapshot exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.previous.is_some()
    }

    fn ensure_host(&self, user: &UserId) -> Result<(), SessionError> {
        if self.is_host(user) {
            Ok(())
        } else {
            Err(SessionError::Forbidden("only the host may do this".to_owned()))
        }
    }

    fn ensure_step(&self, expected: SetupStep) -> Result<(), SessionError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(SessionError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    fn ensure_not_finished(&self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Finished {
            Err(SessionError::SessionFinished)
        } else {
            Ok(())
        }
    }

    fn character(&self, id: Uuid) -> Result<&Character, SessionError> {
        self.world_state
            .character(id)
            .ok_or(SessionError::UnknownCharacter(id))
    }

    fn character_mut(&mut self, id: Uuid) -> Result<&mut Character, SessionError> {
        self.world_state
            .character_mut(id)
            .ok_or(SessionError::UnknownCharacter(id))
    }

    /// Moves the setup flow forward by one step. `play` is entered through
    /// [`GameSession::begin_play`] only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `WrongStep` when `to` does not follow the
    /// current step.
    pub fn advance_step(
        &mut self,
        user: &UserId,
        to: SetupStep,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_host(user)?;
        if to == SetupStep::Play {
            return Err(SessionError::InvalidInput(
                "play begins through begin_play".to_owned(),
            ));
        }
        if self.step.next() != Some(to) {
            let expected = match to {
                SetupStep::Summary => SetupStep::Create,
                SetupStep::Characters => SetupStep::Summary,
                SetupStep::Create | SetupStep::Play => SetupStep::Characters,
            };
            return Err(SessionError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        let from = self.step;
        self.step = to;
        self.record(
            SessionEventKind::StepAdvanced { from, to },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Adds an unclaimed character slot.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `WrongStep` outside the `characters` step.
    pub fn add_character(
        &mut self,
        user: &UserId,
        character: Character,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_host(user)?;
        self.ensure_step(SetupStep::Characters)?;
        let character_id = character.id;
        let name = character.name.clone();
        self.world_state.characters.push(character);
        self.record(
            SessionEventKind::CharacterAdded { character_id, name },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Mirrors a (re)generated campaign into the world state. The undo
    /// snapshot refers to the old graph and is dropped.
    ///
    /// # Errors
    ///
    /// `SessionFinished` once the campaign has ended.
    pub fn mirror_campaign(
        &mut self,
        campaign: &CampaignStructure,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_not_finished()?;
        self.world_state.mirror_campaign(campaign);
        self.previous = None;
        self.campaign_revision += 1;
        if self.step == SetupStep::Play && self.world_state.current_scene.is_none() {
            self.world_state.enter_starting_scene(campaign);
        }
        let scene_node = self
            .world_state
            .current_scene
            .as_ref()
            .map(|scene| scene.node_id.clone());
        self.record(
            SessionEventKind::CampaignMirrored {
                node_count: campaign.nodes.len(),
                scene_node,
            },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Checks whether play may begin, returning the first character.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `WrongStep` outside the `characters` step,
    /// `InvalidInput` without characters.
    pub fn ensure_can_begin_play(&self, user: &UserId) -> Result<Uuid, SessionError> {
        self.ensure_host(user)?;
        self.ensure_step(SetupStep::Characters)?;
        self.world_state
            .characters
            .first()
            .map(|c| c.id)
            .ok_or_else(|| {
                SessionError::InvalidInput("at least one character is required".to_owned())
            })
    }

    /// Leaves setup: mirrors the campaign, places the party on the starting
    /// node, stores the first beat plan, and gives the turn to the first
    /// character.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `WrongStep` outside the `characters` step,
    /// `InvalidInput` without characters, `InvalidCampaign` when the
    /// campaign breaks its invariants.
    pub fn begin_play(
        &mut self,
        user: &UserId,
        campaign: &CampaignStructure,
        beats: Vec<Beat>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        let first_character = self.ensure_can_begin_play(user)?;
        campaign.validate()?;

        self.world_state.mirror_campaign(campaign);
        self.world_state.enter_starting_scene(campaign);
        self.world_state.session_progress.beats = pace_beats(beats);
        self.world_state.session_progress.current_beat = 0;
        self.world_state.touch(clock.now());
        self.step = SetupStep::Play;
        self.status = SessionStatus::Active;
        self.turn = TurnState::Active(first_character);

        let starting_node = self
            .world_state
            .current_scene
            .as_ref()
            .map(|scene| scene.node_id.clone())
            .unwrap_or_default();
        self.messages.push(Message::new(
            Role::System,
            format!(
                "Session {} begins.",
                self.world_state.session_progress.current_session
            ),
            None,
            clock.now(),
        ));
        self.record(
            SessionEventKind::StepAdvanced {
                from: SetupStep::Characters,
                to: SetupStep::Play,
            },
            correlation_id,
            clock,
        );
        self.record(
            SessionEventKind::PlayBegan {
                starting_node,
                first_character,
            },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Binds `user` to a character slot. Claiming one's own slot again is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// `InvalidInput` outside multiplayer, `SessionFinished`,
    /// `UnknownCharacter`, or `AlreadyClaimed` when another user holds it.
    pub fn claim_slot(
        &mut self,
        user: &UserId,
        character_id: Uuid,
        player_name: Option<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_multiplayer()?;
        self.ensure_not_finished()?;
        let character = self.character_mut(character_id)?;
        if character.is_claimed_by(user) {
            return Ok(());
        }
        character.claim(user)?;
        if player_name.is_some() {
            character.player_name = player_name;
        }
        self.record(
            SessionEventKind::SlotClaimed {
                character_id,
                user_id: user.clone(),
            },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Host removes whoever holds a slot. Kicking an empty slot is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidInput` outside multiplayer, `Forbidden` for non-hosts,
    /// `UnknownCharacter`.
    pub fn kick_slot(
        &mut self,
        user: &UserId,
        character_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_multiplayer()?;
        self.ensure_host(user)?;
        let character = self.character_mut(character_id)?;
        let Some(previous) = character.release() else {
            return Ok(());
        };
        character.player_name = None;
        self.record(
            SessionEventKind::SlotReleased {
                character_id,
                user_id: previous,
                kicked: true,
            },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// A player gives up their own slot.
    ///
    /// # Errors
    ///
    /// `UnknownCharacter`, or `Forbidden` when `user` does not hold it.
    pub fn release_slot(
        &mut self,
        user: &UserId,
        character_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        let character = self.character_mut(character_id)?;
        if !character.is_claimed_by(user) {
            return Err(SessionError::Forbidden(
                "only the player holding a slot may release it".to_owned(),
            ));
        }
        character.release();
        character.player_name = None;
        self.record(
            SessionEventKind::SlotReleased {
                character_id,
                user_id: user.clone(),
                kicked: false,
            },
            correlation_id,
            clock,
        );
        Ok(())
    }

    fn ensure_multiplayer(&self) -> Result<(), SessionError> {
        if self.mode.is_multiplayer() {
            Ok(())
        } else {
            Err(SessionError::InvalidInput(
                "character slots exist only in multiplayer sessions".to_owned(),
            ))
        }
    }

    /// The next hot-seat player took the device.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `NoPendingHandoff` when nothing waits.
    pub fn acknowledge_handoff(
        &mut self,
        user: &UserId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Uuid, SessionError> {
        self.ensure_host(user)?;
        let TurnState::PendingHandoff(next) = self.turn else {
            return Err(SessionError::NoPendingHandoff);
        };
        self.turn = TurnState::Active(next);
        self.record(
            SessionEventKind::HandoffAcknowledged { character_id: next },
            correlation_id,
            clock,
        );
        Ok(next)
    }

    /// Works out which character `user` is acting as.
    ///
    /// Hot-seat: the owner acts for `requested` or, by default, the character
    /// whose turn it is. Multiplayer: `requested` must be held by `user`;
    /// otherwise the held character whose turn it is, or the first held one.
    ///
    /// # Errors
    ///
    /// `Forbidden` when `user` may not act for the character,
    /// `UnknownCharacter` for a character not in the session.
    pub fn acting_character(
        &self,
        user: &UserId,
        requested: Option<Uuid>,
    ) -> Result<Option<Uuid>, SessionError> {
        if let Some(id) = requested {
            let character = self.character(id)?;
            let allowed = match self.mode {
                PlayMode::HotSeat => self.is_host(user),
                PlayMode::Multiplayer { .. } => character.is_claimed_by(user),
            };
            return if allowed {
                Ok(Some(id))
            } else {
                Err(SessionError::Forbidden(
                    "this character belongs to another player".to_owned(),
                ))
            };
        }

        match self.mode {
            PlayMode::HotSeat => {
                self.ensure_host(user)?;
                Ok(self.active_character_id())
            }
            PlayMode::Multiplayer { .. } => {
                let held: Vec<Uuid> = self
                    .world_state
                    .characters
                    .iter()
                    .filter(|c| c.is_claimed_by(user))
                    .map(|c| c.id)
                    .collect();
                let active = self.active_character_id();
                Ok(held
                    .iter()
                    .copied()
                    .find(|id| Some(*id) == active)
                    .or_else(|| held.first().copied()))
            }
        }
    }

    /// Checks that `acting` may commit an action right now.
    ///
    /// # Errors
    ///
    /// `WrongStep` before play, `NotYourTurn`, `SessionPaused`,
    /// `SessionFinished`, or `HandoffPending`.
    pub fn ensure_can_act(&self, acting: Option<Uuid>) -> Result<Uuid, SessionError> {
        self.ensure_step(SetupStep::Play)?;
        let active = self.active_character_id();
        let Some(character_id) = acting.filter(|id| Some(*id) == active) else {
            return Err(SessionError::NotYourTurn {
                active,
                attempted: acting,
            });
        };
        match self.status {
            SessionStatus::Active => {}
            SessionStatus::Paused => return Err(SessionError::SessionPaused),
            SessionStatus::Finished => return Err(SessionError::SessionFinished),
        }
        if let TurnState::PendingHandoff(next) = self.turn {
            return Err(SessionError::HandoffPending { next });
        }
        Ok(character_id)
    }

    /// Appends an answered question. The turn does not move.
    ///
    /// # Errors
    ///
    /// `WrongStep` before play.
    pub fn record_answer(
        &mut self,
        asking: Option<Uuid>,
        question: &str,
        answer: String,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Message, SessionError> {
        self.ensure_step(SetupStep::Play)?;
        let now = clock.now();
        let author = asking
            .and_then(|id| self.world_state.character(id))
            .map(|c| c.name.clone());
        self.messages
            .push(Message::new(Role::User, question.trim(), author, now));
        let reply = Message::new(Role::Assistant, answer, None, now);
        self.messages.push(reply.clone());
        self.world_state.touch(now);
        self.record(
            SessionEventKind::QuestionAnswered {
                character_id: asking,
            },
            correlation_id,
            clock,
        );
        Ok(reply)
    }

    /// Commits a resolved action: snapshots for undo, merges the narration's
    /// patch, advances pacing, appends the messages, and rotates the turn.
    ///
    /// # Errors
    ///
    /// Everything [`GameSession::ensure_can_act`] rejects.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_action(
        &mut self,
        acting: Uuid,
        action: &str,
        acknowledgement: String,
        narration: &Narration,
        campaign: &CampaignStructure,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<PatchOutcome, SessionError> {
        let character_id = self.ensure_can_act(Some(acting))?;
        let now = clock.now();
        let author = self.character(character_id)?.name.clone();

        let snapshot = Snapshot {
            world_state: self.world_state.clone(),
            turn: self.turn,
            message_count: self.messages.len(),
            story_message_count: self.story_messages.len(),
        };
        let climax_was_ready = self
            .world_state
            .resolution
            .as_ref()
            .is_some_and(|r| r.climax_ready);

        let outcome = self.world_state.apply_patch(&narration.patch, campaign);
        self.world_state.session_progress.advance_beat();
        self.world_state.touch(now);

        let acknowledgement = Message::new(Role::Assistant, acknowledgement, None, now);
        let narration_message = Message::new(Role::Assistant, narration.text.clone(), None, now)
            .with_mechanics(narration.mechanics.clone());
        self.messages
            .push(Message::new(Role::User, action.trim(), Some(author), now));
        self.messages.push(acknowledgement.clone());
        self.messages.push(narration_message.clone());
        self.story_messages.push(acknowledgement);
        self.story_messages.push(narration_message);

        self.previous = Some(snapshot);
        self.turn_number += 1;

        self.record(
            SessionEventKind::ActionCommitted {
                character_id,
                turn_number: self.turn_number,
                event: self.world_state.recent_events.latest().map(str::to_owned),
                entered_node: outcome.entered_node.clone(),
                rejected_scene: outcome.rejected_scene.clone(),
                filled_clocks: outcome.filled_clocks.clone(),
                achieved_conditions: outcome.achieved_conditions.clone(),
            },
            correlation_id,
            clock,
        );
        let climax_ready = self
            .world_state
            .resolution
            .as_ref()
            .is_some_and(|r| r.climax_ready);
        if climax_ready && !climax_was_ready {
            self.record(SessionEventKind::ClimaxReady, correlation_id, clock);
        }

        self.advance_turn(character_id, correlation_id, clock);
        Ok(outcome)
    }

    fn advance_turn(&mut self, from: Uuid, correlation_id: Uuid, clock: &dyn Clock) {
        let order: Vec<Uuid> = self.world_state.characters.iter().map(|c| c.id).collect();
        let Some(next) = next_in_rotation(&order, from) else {
            return;
        };
        if next == from {
            self.turn = TurnState::Active(next);
            return;
        }
        let handoff_required = !self.mode.is_multiplayer();
        self.turn = if handoff_required {
            TurnState::PendingHandoff(next)
        } else {
            TurnState::Active(next)
        };
        self.record(
            SessionEventKind::TurnAdvanced {
                from,
                to: next,
                handoff_required,
            },
            correlation_id,
            clock,
        );
    }

    /// Restores the snapshot taken before the last committed action and
    /// drops the messages that action appended. There is no redo.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `SessionFinished`, `NothingToUndo`.
    pub fn undo(
        &mut self,
        user: &UserId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_host(user)?;
        self.ensure_not_finished()?;
        let snapshot = self.previous.take().ok_or(SessionError::NothingToUndo)?;

        let removed_messages = self.messages.len().saturating_sub(snapshot.message_count)
            + self
                .story_messages
                .len()
                .saturating_sub(snapshot.story_message_count);
        self.messages.truncate(snapshot.message_count);
        self.story_messages.truncate(snapshot.story_message_count);
        self.world_state = snapshot.world_state;
        self.turn = snapshot.turn;
        self.turn_number += 1;

        self.record(
            SessionEventKind::ActionUndone {
                turn_number: self.turn_number,
                removed_messages,
            },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Freezes turn progression. Pausing a paused session keeps the first
    /// reason and records nothing. `user` is `None` for system pauses.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-participants, `WrongStep` before play,
    /// `SessionFinished`.
    pub fn pause(
        &mut self,
        user: Option<&UserId>,
        reason: PauseReason,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        if let Some(user) = user {
            if !self.is_participant(user) {
                return Err(SessionError::Forbidden(
                    "only players of this session may pause it".to_owned(),
                ));
            }
        }
        self.ensure_step(SetupStep::Play)?;
        match self.status {
            SessionStatus::Finished => return Err(SessionError::SessionFinished),
            SessionStatus::Paused => return Ok(()),
            SessionStatus::Active => {}
        }
        self.status = SessionStatus::Paused;
        self.pause_reason = Some(reason);
        self.record(SessionEventKind::Paused { reason }, correlation_id, clock);
        Ok(())
    }

    /// Compares the time since the last activity with the idle timeout.
    ///
    /// Raises the warning once, `IDLE_WARNING_LEAD_MINUTES` (at most a
    /// quarter of the timeout) before the timeout, and pauses with `IdleTimeout` at the timeout. Sessions that
    /// are not actively playing, or that opted out, are left alone, so the
    /// check can run any number of times.
    pub fn check_idle(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> IdleCheck {
        if self.step != SetupStep::Play
            || self.status != SessionStatus::Active
            || !self.world_state.auto_end_enabled
        {
            return IdleCheck::Unchanged;
        }
        let idle_minutes = clock
            .elapsed_since(self.world_state.last_activity)
            .num_minutes();
        let timeout = i64::from(self.world_state.idle_timeout_minutes);

        if idle_minutes >= timeout {
            self.status = SessionStatus::Paused;
            self.pause_reason = Some(PauseReason::IdleTimeout);
            self.record(
                SessionEventKind::Paused {
                    reason: PauseReason::IdleTimeout,
                },
                correlation_id,
                clock,
            );
            return IdleCheck::Paused;
        }
        let warn_at = timeout - IDLE_WARNING_LEAD_MINUTES.min(timeout / 4);
        if idle_minutes >= warn_at && !self.world_state.idle_warning_shown {
            self.world_state.idle_warning_shown = true;
            self.record(
                SessionEventKind::IdleWarningRaised { idle_minutes },
                correlation_id,
                clock,
            );
            return IdleCheck::Warned;
        }
        IdleCheck::Unchanged
    }

    /// Changes idle handling.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `InvalidInput` for a zero timeout.
    pub fn set_idle_policy(
        &mut self,
        user: &UserId,
        auto_end_enabled: bool,
        idle_timeout_minutes: u32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_host(user)?;
        if idle_timeout_minutes == 0 {
            return Err(SessionError::InvalidInput(
                "idle timeout must be at least one minute".to_owned(),
            ));
        }
        let world = &mut self.world_state;
        if world.auto_end_enabled == auto_end_enabled
            && world.idle_timeout_minutes == idle_timeout_minutes
        {
            return Ok(());
        }
        world.auto_end_enabled = auto_end_enabled;
        world.idle_timeout_minutes = idle_timeout_minutes;
        world.idle_warning_shown = false;
        self.record(
            SessionEventKind::IdlePolicyChanged {
                auto_end_enabled,
                idle_timeout_minutes,
            },
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Whether no further session can be started.
    #[must_use]
    pub fn campaign_finished(&self) -> bool {
        self.world_state
            .resolution
            .as_ref()
            .is_some_and(taleweaver_campaign::Resolution::is_finished)
    }

    /// Checks whether a next session may start, without changing anything.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `WrongStep` before play, `SessionFinished`,
    /// `CampaignAlreadyFinished`.
    pub fn ensure_can_start_next_session(&self, user: &UserId) -> Result<(), SessionError> {
        self.ensure_host(user)?;
        self.ensure_step(SetupStep::Play)?;
        self.ensure_not_finished()?;
        if self.campaign_finished() {
            return Err(SessionError::CampaignAlreadyFinished);
        }
        Ok(())
    }

    /// Starts the next session: bumps the session number, resets pacing to
    /// the new beat plan, and reactivates a paused session. The undo
    /// snapshot does not carry across sessions.
    ///
    /// # Errors
    ///
    /// See [`GameSession::ensure_can_start_next_session`].
    pub fn start_next_session(
        &mut self,
        user: &UserId,
        beats: Vec<Beat>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<u32, SessionError> {
        self.ensure_can_start_next_session(user)?;
        let now = clock.now();
        let beats = pace_beats(beats);
        let beat_count = beats.len();
        self.world_state.session_progress.begin_next_session(beats);
        self.world_state.touch(now);
        self.status = SessionStatus::Active;
        self.pause_reason = None;
        self.previous = None;

        let session_number = self.world_state.session_progress.current_session;
        self.messages.push(Message::new(
            Role::System,
            format!("Session {session_number} begins."),
            None,
            now,
        ));
        self.record(
            SessionEventKind::NextSessionStarted {
                session_number,
                beat_count,
            },
            correlation_id,
            clock,
        );
        Ok(session_number)
    }

    /// Ends the campaign. Irreversible.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-hosts, `SessionFinished` when already finished.
    pub fn finish(
        &mut self,
        user: &UserId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), SessionError> {
        self.ensure_host(user)?;
        self.ensure_not_finished()?;
        self.status = SessionStatus::Finished;
        self.pause_reason = None;
        self.record(SessionEventKind::Finished, correlation_id, clock);
        Ok(())
    }

    fn record(&mut self, kind: SessionEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        self.event_count += 1;
        let metadata = EventMetadata::caused_by_request(
            kind.event_type(),
            self.id,
            self.event_count,
            correlation_id,
            clock.now(),
        );
        self.uncommitted_events.push(SessionEvent { metadata, kind });
    }
}

/// Clamps a beat plan to `MIN_BEATS..=MAX_BEATS`, padding short plans with
/// open-play beats at the intensity of the last planned beat.
#[must_use]
pub fn pace_beats(mut beats: Vec<Beat>) -> Vec<Beat> {
    beats.truncate(MAX_BEATS);
    let intensity = beats.last().map_or(1, |b| b.intensity);
    while beats.len() < MIN_BEATS {
        beats.push(Beat {
            title: format!("Open play {}", beats.len() + 1),
            description: "Follow the players' lead.".to_owned(),
            intensity,
            trigger: None,
        });
    }
    beats
}

impl AggregateRoot for GameSession {
    type Event = SessionEvent;

    const COLLECTION: &'static str = "sessions";

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
