//! The action resolution pipeline.
//!
//! Free-text input is classified as a question or an action. Questions are
//! answered without touching the turn. Actions go through the turn checks,
//! the consequence gate, and two oracle calls (acknowledgement, then
//! resolution) before a single compare-and-swap write commits everything.
//! A failure anywhere before that write leaves the session untouched.

use serde::Serialize;
use taleweaver_core::aggregate::AggregateRoot;
use taleweaver_core::repository::StoredEvent;
use taleweaver_narrative::{
    Classification, ConsequenceCategory, Intent, Narration, NarrationRequest, QuestionRequest,
};
use taleweaver_world_state::PatchOutcome;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::context::SessionContext;
use crate::domain::aggregates::GameSession;
use crate::domain::commands::SubmitInput;
use crate::domain::lifecycle::SetupStep;
use crate::domain::message::Message;
use crate::error::SessionError;

/// What happened to a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// The input was a question and has been answered.
    Answered {
        /// The game master's reply.
        answer: Message,
    },
    /// The action needs explicit confirmation; nothing was written.
    PendingConfirmation {
        /// Text to show the player.
        message: String,
        /// Why confirmation is needed.
        category: ConsequenceCategory,
    },
    /// The action was resolved and committed.
    Resolved {
        /// Short acknowledgement shown first.
        acknowledgement: String,
        /// Full narration.
        narration: Narration,
        /// What the merge changed.
        outcome: PatchOutcome,
    },
}

/// Result of [`handle_submit_input`].
#[derive(Debug)]
pub struct SubmissionResult {
    /// Target session.
    pub session_id: Uuid,
    /// Session document version afterwards.
    pub version: i64,
    /// How the input was classified.
    pub intent: Classification<Intent>,
    /// What happened.
    pub outcome: SubmissionOutcome,
    /// Events committed. Empty for pending confirmations.
    pub stored_events: Vec<StoredEvent>,
}

/// Handles `SubmitInput`.
///
/// # Errors
///
/// `InvalidInput` for blank text, `WrongStep` before play, the turn and
/// lifecycle errors of [`GameSession::ensure_can_act`], `OracleUnavailable`
/// when narration fails, or `StaleTurn` when another action or a campaign
/// regeneration committed first.
#[instrument(skip_all, fields(session_id = %command.session_id, user_id = %command.user_id))]
pub async fn handle_submit_input(
    command: &SubmitInput,
    ctx: &SessionContext,
) -> Result<SubmissionResult, SessionError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SessionError::InvalidInput("input must not be empty".to_owned()));
    }

    let session = ctx.sessions.load(command.session_id).await?;
    if session.step != SetupStep::Play {
        return Err(SessionError::WrongStep {
            expected: SetupStep::Play,
            actual: session.step,
        });
    }
    if !session.is_participant(&command.user_id) {
        return Err(SessionError::Forbidden(
            "only players of this session may submit input".to_owned(),
        ));
    }
    let acting = session.acting_character(&command.user_id, command.character_id)?;

    let context = session
        .world_state
        .current_scene
        .as_ref()
        .map(|scene| scene.description.as_str())
        .unwrap_or_default();
    let intent = ctx.gateway.classify_intent(text, context).await;
    debug!(
        intent = ?intent.label,
        source = ?intent.source,
        confidence = intent.confidence,
        "input classified"
    );

    match intent.label {
        Intent::Question => answer_question(command, ctx, &session, acting, text, intent).await,
        Intent::Action => resolve_action(command, ctx, &session, acting, text, intent).await,
    }
}

async fn answer_question(
    command: &SubmitInput,
    ctx: &SessionContext,
    session: &GameSession,
    asking: Option<Uuid>,
    text: &str,
    intent: Classification<Intent>,
) -> Result<SubmissionResult, SessionError> {
    let request = QuestionRequest {
        question: text,
        world: &session.world_state,
        character: asking.and_then(|id| session.world_state.character(id)),
    };
    let answer = ctx.oracle.answer_question(&request).await?.output;

    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.record_answer(asking, text, answer.clone(), command.correlation_id, clock)
        })
        .await?;
    info!("question answered");
    Ok(SubmissionResult {
        session_id: command.session_id,
        version: mutation.session.version(),
        intent,
        outcome: SubmissionOutcome::Answered {
            answer: mutation.output,
        },
        stored_events: mutation.events,
    })
}

async fn resolve_action(
    command: &SubmitInput,
    ctx: &SessionContext,
    session: &GameSession,
    acting: Option<Uuid>,
    text: &str,
    intent: Classification<Intent>,
) -> Result<SubmissionResult, SessionError> {
    let character_id = session.ensure_can_act(acting)?;
    let character = session
        .world_state
        .character(character_id)
        .ok_or(SessionError::UnknownCharacter(character_id))?;
    let campaign = ctx.campaigns.require(command.session_id).await?;
    let turn_number = session.turn_number;
    let campaign_revision = session.campaign_revision;

    if !command.confirmed {
        let assessment = ctx.gate.assess(text, &session.world_state, character).await?;
        if assessment.needs_confirmation {
            info!(category = ?assessment.category, "action held for confirmation");
            return Ok(SubmissionResult {
                session_id: command.session_id,
                version: session.version(),
                intent,
                outcome: SubmissionOutcome::PendingConfirmation {
                    message: assessment.confirmation_message.unwrap_or_default(),
                    category: assessment.category,
                },
                stored_events: Vec::new(),
            });
        }
    }

    let request = NarrationRequest {
        action: text,
        world: &session.world_state,
        campaign: &campaign.structure,
        scene: session
            .world_state
            .current_scene
            .as_ref()
            .and_then(|scene| campaign.structure.node(&scene.node_id)),
        character,
        rules: ctx.config.rules,
        show_mechanics: ctx.config.show_mechanics,
    };
    let acknowledgement = ctx.oracle.acknowledge(&request).await?;
    let narration = ctx.oracle.resolve_action(&request).await?;
    debug!(
        tokens_used = acknowledgement.tokens_used + narration.tokens_used,
        "action narrated"
    );
    let (acknowledgement, narration) = (acknowledgement.output, narration.output);

    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            // The narration was validated against the campaign loaded above.
            if session.turn_number != turn_number || session.campaign_revision != campaign_revision
            {
                return Err(SessionError::StaleTurn);
            }
            session.commit_action(
                character_id,
                text,
                acknowledgement.clone(),
                &narration,
                &campaign.structure,
                command.correlation_id,
                clock,
            )
        })
        .await?;
    info!(
        character_id = %character_id,
        turn_number = mutation.session.turn_number,
        entered_node = ?mutation.output.entered_node,
        "action committed"
    );
    Ok(SubmissionResult {
        session_id: command.session_id,
        version: mutation.session.version(),
        intent,
        outcome: SubmissionOutcome::Resolved {
            acknowledgement,
            narration,
            outcome: mutation.output,
        },
        stored_events: mutation.events,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use taleweaver_character::Character;
    use taleweaver_core::identity::UserId;
    use taleweaver_core::repository::DocumentStore;
    use taleweaver_narrative::{ConsequenceAssessment, NarrativeOracle, OracleError, Provenance};
    use taleweaver_store::memory::InMemoryDocumentStore;
    use taleweaver_test_support::{FixedClock, ScriptedOracle, fixed_now, sample_campaign};
    use taleweaver_world_state::{SettingCategory, WorldStatePatch};
    use tokio::sync::Barrier;

    use super::*;
    use crate::application::campaign::handle_generate_campaign;
    use crate::application::repository::CampaignDocument;
    use crate::domain::commands::GenerateCampaign;
    use crate::config::PipelineConfig;
    use crate::domain::lifecycle::PauseReason;
    use crate::domain::turn::TurnState;

    struct Table {
        ctx: SessionContext,
        oracle: Arc<ScriptedOracle>,
        session_id: Uuid,
        characters: Vec<Uuid>,
    }

    fn host() -> UserId {
        UserId::from("host")
    }

    /// A session already in play with the given characters, written straight
    /// to the store.
    async fn table(oracle: ScriptedOracle, multiplayer: bool, names: &[&str]) -> Table {
        let oracle = Arc::new(oracle);
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let clock = FixedClock(fixed_now());
        let ctx = SessionContext::new(
            store,
            Arc::clone(&oracle) as Arc<dyn NarrativeOracle>,
            Arc::new(clock),
            PipelineConfig::default(),
        );

        let cid = Uuid::new_v4();
        let mut session = GameSession::create(
            Uuid::new_v4(),
            host(),
            multiplayer,
            "A drowned city",
            SettingCategory::Fantasy,
            cid,
            &clock,
        );
        session.advance_step(&host(), SetupStep::Summary, cid, &clock).unwrap();
        session.advance_step(&host(), SetupStep::Characters, cid, &clock).unwrap();
        for name in names {
            let character = Character::new(Uuid::new_v4(), *name, "", "").unwrap();
            session.add_character(&host(), character, cid, &clock).unwrap();
        }
        let campaign = sample_campaign();
        session
            .begin_play(&host(), &campaign, Vec::new(), cid, &clock)
            .unwrap();
        let session_id = session.id;
        let characters = session.world_state.characters.iter().map(|c| c.id).collect();
        ctx.sessions.create(&mut session).await.unwrap();
        ctx.campaigns
            .save(&mut CampaignDocument {
                session_id,
                structure: campaign,
                generated_at: fixed_now(),
                version: 0,
            })
            .await
            .unwrap();

        Table {
            ctx,
            oracle,
            session_id,
            characters,
        }
    }

    fn input(t: &Table, user: &str, text: &str) -> SubmitInput {
        SubmitInput {
            correlation_id: Uuid::new_v4(),
            session_id: t.session_id,
            user_id: UserId::from(user),
            character_id: None,
            text: text.to_owned(),
            confirmed: false,
        }
    }

    #[tokio::test]
    async fn test_question_is_answered_without_advancing_turn() {
        // Arrange
        let t = table(ScriptedOracle::new(), false, &["Mara", "Tobin"]).await;
        let before = t.ctx.sessions.load(t.session_id).await.unwrap();

        // Act
        let result = handle_submit_input(&input(&t, "host", "What do I see here?"), &t.ctx)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.intent.label, Intent::Question);
        assert!(matches!(result.outcome, SubmissionOutcome::Answered { .. }));
        let after = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(after.turn, before.turn);
        assert_eq!(after.turn_number, before.turn_number);
        assert_eq!(after.messages.len(), before.messages.len() + 2);
        assert!(after.story_messages.is_empty());
        assert_eq!(t.oracle.calls().resolve_action, 0);
    }

    #[tokio::test]
    async fn test_confident_oracle_label_overrides_keywords() {
        // Arrange
        let t = table(
            ScriptedOracle::new().with_label("question", 0.95),
            false,
            &["Mara"],
        )
        .await;

        // Act
        let result = handle_submit_input(&input(&t, "host", "I climb the wall"), &t.ctx)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.intent.label, Intent::Question);
        assert_eq!(result.intent.source, Provenance::Oracle);
        assert!(matches!(result.outcome, SubmissionOutcome::Answered { .. }));
    }

    #[tokio::test]
    async fn test_classifier_outage_falls_back_to_keywords() {
        // Arrange
        let oracle = ScriptedOracle::new()
            .failing_classification(OracleError::Unavailable("timeout".to_owned()));
        let t = table(oracle, false, &["Mara"]).await;

        // Act
        let result = handle_submit_input(&input(&t, "host", "I climb the wall"), &t.ctx)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.intent.label, Intent::Action);
        assert_eq!(result.intent.source, Provenance::FallbackClassifier);
        assert!(matches!(result.outcome, SubmissionOutcome::Resolved { .. }));
        assert_eq!(t.oracle.calls().classify, 1);
    }

    #[tokio::test]
    async fn test_action_commits_and_hands_over() {
        // Arrange
        let t = table(ScriptedOracle::new(), false, &["Mara", "Tobin"]).await;

        // Act
        let result = handle_submit_input(&input(&t, "host", "I try to open the gate"), &t.ctx)
            .await
            .unwrap();

        // Assert
        assert!(matches!(result.outcome, SubmissionOutcome::Resolved { .. }));
        let session = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(session.turn, TurnState::PendingHandoff(t.characters[1]));
        assert_eq!(session.turn_number, 1);
        assert_eq!(session.story_messages.len(), 2);
        assert_eq!(session.world_state.session_progress.current_beat, 1);
        assert!(session.can_undo());
        let types: Vec<_> = result.stored_events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["session.action_committed", "session.turn_advanced"]);
    }

    #[tokio::test]
    async fn test_flagged_action_waits_for_confirmation() {
        // Arrange
        let assessment = ConsequenceAssessment {
            needs_confirmation: true,
            confirmation_message: Some("This will burn the bridge for good.".to_owned()),
            category: ConsequenceCategory::Irreversible,
        };
        let t = table(ScriptedOracle::new().with_assessment(assessment), true, &["Mara"]).await;
        let before = t.ctx.sessions.load(t.session_id).await.unwrap();
        let mut command = input(&t, "host", "burn the bridge");
        t.ctx
            .sessions
            .mutate(t.session_id, |s| {
                let id = s.world_state.characters[0].id;
                s.claim_slot(&host(), id, None, Uuid::new_v4(), &FixedClock(fixed_now()))
            })
            .await
            .unwrap();

        // Act
        let pending = handle_submit_input(&command, &t.ctx).await.unwrap();
        command.confirmed = true;
        let confirmed = handle_submit_input(&command, &t.ctx).await.unwrap();

        // Assert
        assert!(matches!(
            pending.outcome,
            SubmissionOutcome::PendingConfirmation {
                category: ConsequenceCategory::Irreversible,
                ..
            }
        ));
        assert!(pending.stored_events.is_empty());
        assert!(matches!(confirmed.outcome, SubmissionOutcome::Resolved { .. }));
        assert_eq!(t.oracle.calls().assess_consequences, 1);
        let after = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(after.turn_number, before.turn_number + 1);
    }

    #[tokio::test]
    async fn test_narration_failure_writes_nothing() {
        // Arrange
        let t = table(
            ScriptedOracle::new()
                .failing_resolution(OracleError::Unavailable("timeout".to_owned())),
            false,
            &["Mara"],
        )
        .await;
        let before = t.ctx.sessions.load(t.session_id).await.unwrap();

        // Act
        let result = handle_submit_input(&input(&t, "host", "climb the tower"), &t.ctx).await;

        // Assert
        let error = result.unwrap_err();
        assert!(matches!(error, SessionError::OracleUnavailable(_)));
        assert!(error.is_retryable());
        let after = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(after.version(), before.version());
        assert_eq!(after.world_state, before.world_state);
        assert_eq!(after.messages, before.messages);
    }

    #[tokio::test]
    async fn test_paused_session_rejects_actions_but_answers_questions() {
        // Arrange
        let t = table(ScriptedOracle::new(), false, &["Mara"]).await;
        t.ctx
            .sessions
            .mutate(t.session_id, |s| {
                s.pause(None, PauseReason::Early, Uuid::new_v4(), &FixedClock(fixed_now()))
            })
            .await
            .unwrap();

        // Act
        let action = handle_submit_input(&input(&t, "host", "run to the docks"), &t.ctx).await;
        let question = handle_submit_input(&input(&t, "host", "Who is here?"), &t.ctx).await;

        // Assert
        assert!(matches!(action, Err(SessionError::SessionPaused)));
        assert!(question.is_ok());
    }

    #[tokio::test]
    async fn test_multiplayer_player_without_slot_cannot_act() {
        let t = table(ScriptedOracle::new(), true, &["Mara"]).await;
        t.ctx
            .sessions
            .mutate(t.session_id, |s| {
                let id = s.world_state.characters[0].id;
                let clock = FixedClock(fixed_now());
                s.claim_slot(&UserId::from("alice"), id, None, Uuid::new_v4(), &clock)
            })
            .await
            .unwrap();

        let result = handle_submit_input(&input(&t, "host", "attack the guard"), &t.ctx).await;

        assert!(matches!(result, Err(SessionError::NotYourTurn { .. })));
    }

    #[tokio::test]
    async fn test_waiting_player_may_ask_but_not_act() {
        // Arrange
        let t = table(ScriptedOracle::new(), true, &["Mara", "Tobin"]).await;
        t.ctx
            .sessions
            .mutate(t.session_id, |s| {
                let clock = FixedClock(fixed_now());
                let mara = s.world_state.characters[0].id;
                let tobin = s.world_state.characters[1].id;
                s.claim_slot(&UserId::from("alice"), mara, None, Uuid::new_v4(), &clock)?;
                s.claim_slot(&UserId::from("bob"), tobin, None, Uuid::new_v4(), &clock)
            })
            .await
            .unwrap();
        let before = t.ctx.sessions.load(t.session_id).await.unwrap();

        // Act
        let question = handle_submit_input(&input(&t, "bob", "What do I see here?"), &t.ctx)
            .await
            .unwrap();
        let action = handle_submit_input(&input(&t, "bob", "attack the guard"), &t.ctx).await;

        // Assert
        assert!(matches!(question.outcome, SubmissionOutcome::Answered { .. }));
        assert!(matches!(action, Err(SessionError::NotYourTurn { .. })));
        let after = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(before.turn, TurnState::Active(t.characters[0]));
        assert_eq!(after.turn, before.turn);
        assert_eq!(after.turn_number, before.turn_number);
    }

    #[tokio::test]
    async fn test_oracle_patch_moves_scene_along_a_lead() {
        // Arrange
        let narration = Narration {
            text: "You reach the library.".to_owned(),
            mechanics: None,
            patch: WorldStatePatch {
                scene_change: Some(taleweaver_world_state::SceneChange {
                    node: "The Old Library".to_owned(),
                    description: "Dusty shelves.".to_owned(),
                    present_npcs: Vec::new(),
                }),
                ..WorldStatePatch::default()
            },
        };
        let t = table(ScriptedOracle::new().with_narration(narration), false, &["Mara"]).await;

        // Act
        let result = handle_submit_input(&input(&t, "host", "walk to the library"), &t.ctx)
            .await
            .unwrap();

        // Assert
        let SubmissionOutcome::Resolved { outcome, .. } = result.outcome else {
            panic!("expected a resolved action");
        };
        assert_eq!(outcome.entered_node.as_deref(), Some("node-2"));
        let session = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(session.world_state.current_scene.unwrap().node_id, "node-2");
    }

    #[tokio::test]
    async fn test_racing_actions_commit_once() {
        // Arrange
        let barrier = Arc::new(Barrier::new(2));
        let t = table(
            ScriptedOracle::new().with_resolution_barrier(Arc::clone(&barrier)),
            false,
            &["Mara", "Tobin"],
        )
        .await;
        let first = input(&t, "host", "open the gate");
        let second = input(&t, "host", "climb the wall");

        // Act
        let (a, b) = tokio::join!(
            handle_submit_input(&first, &t.ctx),
            handle_submit_input(&second, &t.ctx)
        );

        // Assert
        assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(SessionError::StaleTurn)));
        let session = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(session.turn_number, 1);
        assert_eq!(session.story_messages.len(), 2);
    }

    #[tokio::test]
    async fn test_regeneration_during_resolution_makes_action_stale() {
        // Arrange
        let barrier = Arc::new(Barrier::new(2));
        let mut regenerated = sample_campaign();
        for node in &mut regenerated.nodes {
            node.id = format!("regen-{}", node.id);
        }
        let oracle = ScriptedOracle::new()
            .with_campaign(regenerated.clone())
            .with_resolution_barrier(Arc::clone(&barrier));
        let t = table(oracle, false, &["Mara"]).await;
        let action = input(&t, "host", "walk to the library");
        let regenerate = GenerateCampaign {
            correlation_id: Uuid::new_v4(),
            session_id: t.session_id,
            user_id: host(),
        };

        // Act
        let (acted, generated) = tokio::join!(handle_submit_input(&action, &t.ctx), async {
            let result = handle_generate_campaign(&regenerate, &t.ctx).await;
            barrier.wait().await;
            result
        });

        // Assert
        assert!(generated.is_ok());
        assert!(matches!(acted, Err(SessionError::StaleTurn)));
        let session = t.ctx.sessions.load(t.session_id).await.unwrap();
        assert_eq!(session.turn_number, 0);
        let scene = session.world_state.current_scene.unwrap();
        assert!(regenerated.contains_node(&scene.node_id));
    }
}
