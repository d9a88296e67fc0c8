//! Command handlers for the Session context.
//!
//! Each handler loads the session, runs the domain operation against it, and
//! writes it back with compare-and-swap. Oracle calls happen before the
//! write and never inside the retry loop; if the oracle fails, nothing is
//! written.

use taleweaver_campaign::CampaignStructure;
use taleweaver_character::Character;
use taleweaver_core::aggregate::AggregateRoot;
use taleweaver_core::identity::UserId;
use taleweaver_narrative::{BeatPlanRequest, OracleError};
use taleweaver_world_state::{Beat, WorldState};
use tracing::{info, instrument};
use uuid::Uuid;

use super::context::{SessionCommandResult, SessionContext};
use crate::domain::aggregates::GameSession;
use crate::domain::commands::{
    AcknowledgeHandoff, AddCharacter, AdvanceStep, BeginPlay, ClaimSlot, CreateSession,
    DeleteSession, FinishSession, KickSlot, PauseSession, ReleaseSlot, SetIdlePolicy,
    StartNextSession, UndoLastAction,
};
use crate::error::SessionError;

/// Handles `CreateSession`: classifies the setting's genre and writes the
/// new session.
///
/// # Errors
///
/// `InvalidInput` for a blank setting, `Conflict` if the id is taken.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_create_session(
    command: &CreateSession,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    if command.setting.trim().is_empty() {
        return Err(SessionError::InvalidInput("setting must not be empty".to_owned()));
    }
    let genre = ctx.gateway.classify_setting(&command.setting).await;

    let mut session = GameSession::create(
        command.session_id,
        command.owner_id.clone(),
        command.multiplayer,
        command.setting.trim(),
        genre.label,
        command.correlation_id,
        ctx.clock.as_ref(),
    );
    let stored_events = ctx.sessions.create(&mut session).await?;

    info!(
        genre = genre.label.key(),
        source = ?genre.source,
        multiplayer = command.multiplayer,
        "session created"
    );
    Ok(SessionCommandResult {
        session_id: session.id,
        version: session.version(),
        stored_events,
    })
}

/// Handles `AdvanceStep`.
///
/// # Errors
///
/// See [`GameSession::advance_step`].
pub async fn handle_advance_step(
    command: &AdvanceStep,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.advance_step(&command.user_id, command.to, command.correlation_id, clock)
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `AddCharacter`.
///
/// # Errors
///
/// `InvalidInput` for a blank name, otherwise see
/// [`GameSession::add_character`].
pub async fn handle_add_character(
    command: &AddCharacter,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let mut character = Character::new(
        Uuid::new_v4(),
        command.name.trim(),
        command.description.clone(),
        command.aspect.clone(),
    )?;
    character.archetype.clone_from(&command.archetype);
    character.player_name.clone_from(&command.player_name);
    character.demographics = command.demographics.clone();
    character.stats = command.stats.clone();

    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.add_character(
                &command.user_id,
                character.clone(),
                command.correlation_id,
                clock,
            )
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `BeginPlay`: plans the first session's beats, then mirrors the
/// campaign and hands the turn to the first character.
///
/// # Errors
///
/// `OracleUnavailable` when beat planning fails, `InvalidInput` before a
/// campaign exists, otherwise see [`GameSession::begin_play`].
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_begin_play(
    command: &BeginPlay,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let session = ctx.sessions.load(command.session_id).await?;
    session.ensure_can_begin_play(&command.user_id)?;
    let campaign = ctx.campaigns.require(command.session_id).await?;
    campaign.structure.validate()?;

    let mut preview = session.world_state.clone();
    preview.mirror_campaign(&campaign.structure);
    preview.enter_starting_scene(&campaign.structure);
    let beats = plan_beats(ctx, &preview, &campaign.structure, 1).await?;

    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.begin_play(
                &command.user_id,
                &campaign.structure,
                beats.clone(),
                command.correlation_id,
                clock,
            )
        })
        .await?;
    info!("play began");
    Ok(mutation.into())
}

/// Handles `StartNextSession`: plans the new session's beats, then bumps the
/// session number.
///
/// # Errors
///
/// `OracleUnavailable` when beat planning fails, `Conflict` when another
/// request started a session first, otherwise see
/// [`GameSession::start_next_session`].
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_start_next_session(
    command: &StartNextSession,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let session = ctx.sessions.load(command.session_id).await?;
    session.ensure_can_start_next_session(&command.user_id)?;
    let campaign = ctx.campaigns.require(command.session_id).await?;
    let planned_from = session.world_state.session_progress.current_session;
    let beats =
        plan_beats(ctx, &session.world_state, &campaign.structure, planned_from + 1).await?;

    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            if session.world_state.session_progress.current_session != planned_from {
                return Err(SessionError::Conflict);
            }
            session.start_next_session(
                &command.user_id,
                beats.clone(),
                command.correlation_id,
                clock,
            )
        })
        .await?;
    info!(session_number = mutation.output, "next session started");
    Ok(mutation.into())
}

async fn plan_beats(
    ctx: &SessionContext,
    world: &WorldState,
    campaign: &CampaignStructure,
    session_number: u32,
) -> Result<Vec<Beat>, SessionError> {
    let request = BeatPlanRequest {
        world,
        campaign,
        session_number,
    };
    let beats = ctx.oracle.plan_beats(&request).await?.output;
    if beats.is_empty() {
        return Err(OracleError::EmptyResponse.into());
    }
    Ok(beats)
}

/// Handles `ClaimSlot`.
///
/// # Errors
///
/// See [`GameSession::claim_slot`].
pub async fn handle_claim_slot(
    command: &ClaimSlot,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.claim_slot(
                &command.user_id,
                command.character_id,
                command.player_name.clone(),
                command.correlation_id,
                clock,
            )
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `KickSlot`.
///
/// # Errors
///
/// See [`GameSession::kick_slot`].
pub async fn handle_kick_slot(
    command: &KickSlot,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.kick_slot(
                &command.user_id,
                command.character_id,
                command.correlation_id,
                clock,
            )
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `ReleaseSlot`.
///
/// # Errors
///
/// See [`GameSession::release_slot`].
pub async fn handle_release_slot(
    command: &ReleaseSlot,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.release_slot(
                &command.user_id,
                command.character_id,
                command.correlation_id,
                clock,
            )
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `AcknowledgeHandoff`.
///
/// # Errors
///
/// See [`GameSession::acknowledge_handoff`].
pub async fn handle_acknowledge_handoff(
    command: &AcknowledgeHandoff,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.acknowledge_handoff(&command.user_id, command.correlation_id, clock)
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `PauseSession`.
///
/// # Errors
///
/// See [`GameSession::pause`].
pub async fn handle_pause(
    command: &PauseSession,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.pause(
                Some(&command.user_id),
                command.reason,
                command.correlation_id,
                clock,
            )
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `FinishSession`.
///
/// # Errors
///
/// See [`GameSession::finish`].
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_finish(
    command: &FinishSession,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.finish(&command.user_id, command.correlation_id, clock)
        })
        .await?;
    info!("session finished");
    Ok(mutation.into())
}

/// Handles `SetIdlePolicy`.
///
/// # Errors
///
/// See [`GameSession::set_idle_policy`].
pub async fn handle_set_idle_policy(
    command: &SetIdlePolicy,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.set_idle_policy(
                &command.user_id,
                command.auto_end_enabled,
                command.idle_timeout_minutes,
                command.correlation_id,
                clock,
            )
        })
        .await?;
    Ok(mutation.into())
}

/// Handles `UndoLastAction`.
///
/// # Errors
///
/// See [`GameSession::undo`].
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_undo(
    command: &UndoLastAction,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.undo(&command.user_id, command.correlation_id, clock)
        })
        .await?;
    info!(turn_number = mutation.session.turn_number, "last action undone");
    Ok(mutation.into())
}

/// Handles `DeleteSession`: removes the session and its campaign.
///
/// # Errors
///
/// `Forbidden` unless the owner asks, `NotFound` for unknown sessions.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_delete_session(
    command: &DeleteSession,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let session = ctx.sessions.load(command.session_id).await?;
    ensure_owner(&session, &command.user_id)?;
    ctx.campaigns.delete(command.session_id).await?;
    ctx.sessions.delete(command.session_id).await?;
    info!("session deleted");
    Ok(SessionCommandResult {
        session_id: command.session_id,
        version: 0,
        stored_events: Vec::new(),
    })
}

fn ensure_owner(session: &GameSession, user: &UserId) -> Result<(), SessionError> {
    if &session.owner_id == user {
        Ok(())
    } else {
        Err(SessionError::Forbidden("only the owner may delete a session".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use taleweaver_character::{CharacterStats, Demographics};
    use taleweaver_core::repository::DocumentStore;
    use taleweaver_store::memory::InMemoryDocumentStore;
    use taleweaver_test_support::{FixedClock, GatedDocumentStore, ScriptedOracle, fixed_now};
    use taleweaver_world_state::SettingCategory;

    use super::*;
    use crate::application::campaign::handle_generate_campaign;
    use crate::config::PipelineConfig;
    use crate::domain::commands::GenerateCampaign;
    use crate::domain::lifecycle::{SessionStatus, SetupStep};
    use crate::domain::turn::TurnState;

    fn context(oracle: ScriptedOracle) -> (SessionContext, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let ctx = SessionContext::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            Arc::new(oracle),
            Arc::new(FixedClock(fixed_now())),
            PipelineConfig::default(),
        );
        (ctx, store)
    }

    fn host() -> UserId {
        UserId::from("host")
    }

    async fn created(ctx: &SessionContext, multiplayer: bool) -> Uuid {
        let command = CreateSession {
            correlation_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            owner_id: host(),
            multiplayer,
            setting: "A haunted manor ruled by a cult".to_owned(),
        };
        handle_create_session(&command, ctx).await.unwrap().session_id
    }

    async fn advance(ctx: &SessionContext, session_id: Uuid, to: SetupStep) {
        let command = AdvanceStep {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
            to,
        };
        handle_advance_step(&command, ctx).await.unwrap();
    }

    async fn add(ctx: &SessionContext, session_id: Uuid, name: &str) {
        let command = AddCharacter {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
            name: name.to_owned(),
            description: String::new(),
            aspect: String::new(),
            archetype: None,
            player_name: None,
            demographics: Demographics::default(),
            stats: CharacterStats::default(),
        };
        handle_add_character(&command, ctx).await.unwrap();
    }

    async fn generate(ctx: &SessionContext, session_id: Uuid) {
        let command = GenerateCampaign {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
        };
        handle_generate_campaign(&command, ctx).await.unwrap();
    }

    fn begin(session_id: Uuid) -> BeginPlay {
        BeginPlay {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
        }
    }

    #[tokio::test]
    async fn test_create_session_classifies_setting_by_keywords() {
        // Arrange
        let (ctx, store) = context(ScriptedOracle::new());

        // Act
        let session_id = created(&ctx, false).await;

        // Assert
        let session = ctx.sessions.load(session_id).await.unwrap();
        assert_eq!(session.world_state.setting_category, SettingCategory::Horror);
        assert_eq!(session.version(), 1);
        let journal = store.journal_for("sessions", session_id);
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].event_type, "session.created");
    }

    #[tokio::test]
    async fn test_create_session_rejects_blank_setting() {
        let (ctx, _) = context(ScriptedOracle::new());
        let command = CreateSession {
            correlation_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            owner_id: host(),
            multiplayer: false,
            setting: "   ".to_owned(),
        };

        let result = handle_create_session(&command, &ctx).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_full_setup_flow_reaches_play() {
        // Arrange
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, false).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        add(&ctx, session_id, "Mara").await;
        generate(&ctx, session_id).await;

        // Act
        let result = handle_begin_play(&begin(session_id), &ctx).await.unwrap();

        // Assert
        let session = ctx.sessions.load(session_id).await.unwrap();
        assert_eq!(session.step, SetupStep::Play);
        assert!(matches!(session.turn, TurnState::Active(_)));
        assert!(session.world_state.current_scene.is_some());
        assert_eq!(result.version, session.version());
        let types: Vec<_> = result.stored_events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["session.step_advanced", "session.play_began"]);
    }

    #[tokio::test]
    async fn test_begin_play_without_campaign_is_rejected() {
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, false).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        add(&ctx, session_id, "Mara").await;

        let result = handle_begin_play(&begin(session_id), &ctx).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_begin_play_with_failing_planner_writes_nothing() {
        // Arrange
        let (ctx, _) = context(
            ScriptedOracle::new().failing_beats(OracleError::Unavailable("down".to_owned())),
        );
        let session_id = created(&ctx, false).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        add(&ctx, session_id, "Mara").await;
        generate(&ctx, session_id).await;
        let before = ctx.sessions.load(session_id).await.unwrap();

        // Act
        let result = handle_begin_play(&begin(session_id), &ctx).await;

        // Assert
        assert!(matches!(result, Err(SessionError::OracleUnavailable(_))));
        let after = ctx.sessions.load(session_id).await.unwrap();
        assert_eq!(after.version(), before.version());
        assert_eq!(after.step, SetupStep::Characters);
    }

    #[tokio::test]
    async fn test_begin_play_clamps_an_oversized_beat_plan() {
        // Arrange
        let beats = (1..=20)
            .map(|i| Beat {
                title: format!("Beat {i}"),
                description: String::new(),
                intensity: 2,
                trigger: None,
            })
            .collect();
        let (ctx, _) = context(ScriptedOracle::new().with_beats(beats));
        let session_id = created(&ctx, false).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        add(&ctx, session_id, "Mara").await;
        generate(&ctx, session_id).await;

        // Act
        handle_begin_play(&begin(session_id), &ctx).await.unwrap();

        // Assert
        let session = ctx.sessions.load(session_id).await.unwrap();
        let planned = &session.world_state.session_progress.beats;
        assert_eq!(planned.len(), 18);
        assert_eq!(planned[0].title, "Beat 1");
    }

    #[tokio::test]
    async fn test_non_host_cannot_add_characters() {
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, true).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        let command = AddCharacter {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: UserId::from("mallory"),
            name: "Intruder".to_owned(),
            description: String::new(),
            aspect: String::new(),
            archetype: None,
            player_name: None,
            demographics: Demographics::default(),
            stats: CharacterStats::default(),
        };

        let result = handle_add_character(&command, &ctx).await;

        assert!(matches!(result, Err(SessionError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_start_next_session_after_play() {
        // Arrange
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, false).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        add(&ctx, session_id, "Mara").await;
        generate(&ctx, session_id).await;
        handle_begin_play(&begin(session_id), &ctx).await.unwrap();
        let command = StartNextSession {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
        };

        // Act
        handle_start_next_session(&command, &ctx).await.unwrap();

        // Assert
        let session = ctx.sessions.load(session_id).await.unwrap();
        assert_eq!(session.world_state.session_progress.current_session, 2);
        assert_eq!(session.world_state.session_progress.current_beat, 0);
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_finish_twice_reports_finished() {
        // Arrange
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, false).await;
        let command = FinishSession {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
        };
        handle_finish(&command, &ctx).await.unwrap();

        // Act
        let result = handle_finish(&command, &ctx).await;

        // Assert
        assert!(matches!(result, Err(SessionError::SessionFinished)));
    }

    #[tokio::test]
    async fn test_idle_policy_rejects_zero_timeout() {
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, false).await;
        let command = SetIdlePolicy {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
            auto_end_enabled: true,
            idle_timeout_minutes: 0,
        };

        let result = handle_set_idle_policy(&command, &ctx).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_session_and_campaign() {
        // Arrange
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, false).await;
        generate(&ctx, session_id).await;
        let command = DeleteSession {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: host(),
        };

        // Act
        handle_delete_session(&command, &ctx).await.unwrap();

        // Assert
        assert!(matches!(
            ctx.sessions.load(session_id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(ctx.campaigns.load(session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claims_survive_reload() {
        // Arrange
        let (ctx, _) = context(ScriptedOracle::new());
        let session_id = created(&ctx, true).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        add(&ctx, session_id, "Mara").await;
        let session = ctx.sessions.load(session_id).await.unwrap();
        let character_id = session.world_state.characters[0].id;
        let command = ClaimSlot {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: UserId::from("alice"),
            character_id,
            player_name: Some("Alice".to_owned()),
        };

        // Act
        handle_claim_slot(&command, &ctx).await.unwrap();

        // Assert
        let session = ctx.sessions.load(session_id).await.unwrap();
        let mara = &session.world_state.characters[0];
        assert!(mara.is_claimed_by(&UserId::from("alice")));
        assert_eq!(mara.player_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_exactly_one_winner() {
        // Arrange
        let (ctx, store) = context(ScriptedOracle::new());
        let session_id = created(&ctx, true).await;
        advance(&ctx, session_id, SetupStep::Summary).await;
        advance(&ctx, session_id, SetupStep::Characters).await;
        add(&ctx, session_id, "Mara").await;
        let session = ctx.sessions.load(session_id).await.unwrap();
        let character_id = session.world_state.characters[0].id;
        let claim = |user: &str| ClaimSlot {
            correlation_id: Uuid::new_v4(),
            session_id,
            user_id: UserId::from(user),
            character_id,
            player_name: None,
        };
        let (alice, bob) = (claim("alice"), claim("bob"));
        // Both claimers load the same version before either writes.
        let racing = SessionContext::new(
            Arc::new(GatedDocumentStore::new(store as Arc<dyn DocumentStore>, 2)),
            Arc::new(ScriptedOracle::new()),
            Arc::new(FixedClock(fixed_now())),
            PipelineConfig::default(),
        );

        // Act
        let (a, b) = tokio::join!(
            handle_claim_slot(&alice, &racing),
            handle_claim_slot(&bob, &racing)
        );

        // Assert
        assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(SessionError::AlreadyClaimed { .. })));
        let session = ctx.sessions.load(session_id).await.unwrap();
        assert_eq!(session.version(), 5);
    }
}
