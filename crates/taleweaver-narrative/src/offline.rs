//! Deterministic oracle used when no model backend is configured.
//!
//! Classifications come back with zero confidence so the keyword fallback
//! always decides. Nothing is ever flagged for confirmation.

use async_trait::async_trait;
use taleweaver_campaign::{
    CampaignIssue, CampaignStructure, Face, Faction, FactionClock, Resolution, SituationNode,
    VictoryCondition,
};
use taleweaver_world_state::{Beat, SettingCategory, WorldStatePatch};

use crate::consequence::ConsequenceAssessment;
use crate::error::OracleError;
use crate::oracle::{
    BeatPlanRequest, CampaignRequest, ClassificationRequest, ConsequenceRequest, Narration,
    NarrationRequest, NarrativeOracle, OracleLabel, OracleResponse, QuestionRequest,
};

/// Number of beats in an offline session plan.
pub const OFFLINE_BEAT_COUNT: usize = 12;

const NODE_TITLES: [&str; 5] = [
    "The Crossroads",
    "The Old Library",
    "The Harbor",
    "The Watchtower",
    "The Sunken Vault",
];

/// Template-driven oracle with no external calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

impl OfflineOracle {
    /// Creates the oracle.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NarrativeOracle for OfflineOracle {
    async fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<OracleResponse<OracleLabel>, OracleError> {
        let label = request
            .labels
            .first()
            .ok_or_else(|| OracleError::InvalidResponse("no labels offered".to_owned()))?;
        Ok(OracleResponse::new(
            OracleLabel {
                label: (*label).to_owned(),
                confidence: 0.0,
                reasoning: "offline oracle does not classify".to_owned(),
            },
            0,
        ))
    }

    async fn assess_consequences(
        &self,
        _request: &ConsequenceRequest<'_>,
    ) -> Result<OracleResponse<ConsequenceAssessment>, OracleError> {
        Ok(OracleResponse::new(ConsequenceAssessment::proceed(), 0))
    }

    async fn acknowledge(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError> {
        Ok(OracleResponse::new(
            format!("{} moves to act.", request.character.name),
            0,
        ))
    }

    async fn resolve_action(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<Narration>, OracleError> {
        let name = &request.character.name;
        let action = request.action.trim();
        let place = request.scene.map_or("the scene", |node| node.title.as_str());
        let text = format!("{name} attempts to {action} at {place}. The world shifts in response.");
        let mechanics = request
            .show_mechanics
            .then(|| format!("{:?}: no roll made offline", request.rules));
        Ok(OracleResponse::new(
            Narration {
                text,
                mechanics,
                patch: WorldStatePatch {
                    event: Some(format!("{name}: {action}")),
                    ..WorldStatePatch::default()
                },
            },
            0,
        ))
    }

    async fn answer_question(
        &self,
        request: &QuestionRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError> {
        let scene = request
            .world
            .current_scene
            .as_ref()
            .map_or("Nothing stands out yet.", |s| s.description.as_str());
        Ok(OracleResponse::new(
            format!("You consider \"{}\". {scene}", request.question.trim()),
            0,
        ))
    }

    async fn plan_beats(
        &self,
        request: &BeatPlanRequest<'_>,
    ) -> Result<OracleResponse<Vec<Beat>>, OracleError> {
        let session = request.session_number;
        let beats = (0..OFFLINE_BEAT_COUNT)
            .map(|i| {
                let intensity = u8::try_from(1 + i * 5 / OFFLINE_BEAT_COUNT).unwrap_or(5);
                Beat {
                    title: format!("Session {session}, beat {}", i + 1),
                    description: "Let the players push the story forward.".to_owned(),
                    intensity,
                    trigger: None,
                }
            })
            .collect();
        Ok(OracleResponse::new(beats, 0))
    }

    async fn generate_campaign(
        &self,
        request: &CampaignRequest<'_>,
    ) -> Result<OracleResponse<CampaignStructure>, OracleError> {
        Ok(OracleResponse::new(
            skeleton_campaign(request.setting, request.category),
            0,
        ))
    }
}

/// A minimal campaign that satisfies every structural invariant.
#[must_use]
pub fn skeleton_campaign(setting: &str, category: SettingCategory) -> CampaignStructure {
    let genre = category.key();
    let steps = |who: &str| {
        (1..=4)
            .map(|n| format!("{who} moves closer to its goal ({n}/4)"))
            .collect::<Vec<_>>()
    };
    let count = NODE_TITLES.len();
    let nodes = NODE_TITLES
        .iter()
        .enumerate()
        .map(|(i, title)| SituationNode {
            id: format!("node-{}", i + 1),
            title: (*title).to_owned(),
            description: format!("{title}, in a {genre} world."),
            is_starting_node: i == 0,
            leads: vec![
                NODE_TITLES[(i + 1) % count].to_owned(),
                NODE_TITLES[(i + 2) % count].to_owned(),
            ],
            stakes: "Who controls what happens next.".to_owned(),
            challenges: vec!["A locked way forward".to_owned()],
            faces: vec![Face {
                name: format!("Keeper of {title}"),
                role: "Local contact".to_owned(),
            }],
            aspects: vec!["Watched by Strangers".to_owned(), "Older Than It Looks".to_owned()],
        })
        .collect();

    CampaignStructure {
        campaign_issues: vec![
            CampaignIssue {
                name: "Old Debts Come Due".to_owned(),
                description: setting.trim().to_owned(),
            },
            CampaignIssue {
                name: "A Storm on the Horizon".to_owned(),
                description: "Something is coming.".to_owned(),
            },
        ],
        campaign_aspects: vec![
            "Nobody Trusts the Roads".to_owned(),
            "Every Ally Has a Price".to_owned(),
            "The Past Will Not Stay Buried".to_owned(),
        ],
        factions: vec![
            Faction {
                name: "The Wardens".to_owned(),
                description: "Keepers of the old order.".to_owned(),
                clock: FactionClock::new("Seal the vault forever", steps("The Wardens")),
            },
            Faction {
                name: "The Unbound".to_owned(),
                description: "Those who want the vault opened.".to_owned(),
                clock: FactionClock::new("Open the vault", steps("The Unbound")),
            },
        ],
        nodes,
        resolution: Resolution {
            primary_objective: "Decide the fate of the Sunken Vault".to_owned(),
            hidden_truth: "The vault holds nothing but the wardens' own mistakes.".to_owned(),
            victory_conditions: vec![
                VictoryCondition {
                    description: "Reach the Sunken Vault".to_owned(),
                    achieved: false,
                },
                VictoryCondition {
                    description: "Win over one faction".to_owned(),
                    achieved: false,
                },
            ],
            convergence_triggers: vec!["Either clock fills".to_owned()],
            climax_ready: false,
            climax_location: "The Sunken Vault".to_owned(),
            involved_factions: vec!["The Wardens".to_owned(), "The Unbound".to_owned()],
        },
    }
}
