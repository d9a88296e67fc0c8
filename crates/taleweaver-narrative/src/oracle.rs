//! Port to the external narration/classification oracle.
//!
//! The oracle is a stateless request/response text-generation capability.
//! It may fail or return low-confidence output at any time; callers decide
//! whether to fall back (classification) or fail closed (everything else).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taleweaver_campaign::{CampaignStructure, SituationNode};
use taleweaver_character::Character;
use taleweaver_world_state::{Beat, SettingCategory, WorldState, WorldStatePatch};

use crate::consequence::ConsequenceAssessment;
use crate::error::OracleError;

/// Structured oracle output plus its token cost.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleResponse<T> {
    /// Parsed output.
    pub output: T,
    /// Tokens consumed by the call.
    pub tokens_used: u32,
}

impl<T> OracleResponse<T> {
    /// Wraps output with a token count.
    pub fn new(output: T, tokens_used: u32) -> Self {
        Self {
            output,
            tokens_used,
        }
    }
}

/// Which classifier is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationKind {
    /// Action vs question.
    Intent,
    /// Genre of a setting description.
    SettingGenre,
}

/// Input to a classification call.
#[derive(Debug, Clone)]
pub struct ClassificationRequest<'a> {
    /// Which classifier.
    pub kind: ClassificationKind,
    /// Raw text to classify.
    pub text: &'a str,
    /// Free-form context, e.g. the current scene.
    pub context: &'a str,
    /// Allowed labels.
    pub labels: Vec<&'static str>,
}

/// Raw classifier verdict from the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleLabel {
    /// Chosen label.
    pub label: String,
    /// Self-reported confidence.
    pub confidence: f64,
    /// Short justification.
    pub reasoning: String,
}

/// Rules system the narration should follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesAdapter {
    /// Fate Core.
    #[default]
    FateCore,
    /// Fate Accelerated Edition.
    FateAccelerated,
}

impl std::str::FromStr for RulesAdapter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fate_core" | "fate-core" => Ok(Self::FateCore),
            "fate_accelerated" | "fate-accelerated" | "fae" => Ok(Self::FateAccelerated),
            other => Err(format!("unknown rules adapter `{other}`")),
        }
    }
}

/// Input to a consequence assessment.
#[derive(Debug, Clone, Copy)]
pub struct ConsequenceRequest<'a> {
    /// What the character attempts.
    pub action: &'a str,
    /// Current world.
    pub world: &'a WorldState,
    /// Acting character.
    pub character: &'a Character,
}

/// Input to acknowledgement and resolution narration.
#[derive(Debug, Clone, Copy)]
pub struct NarrationRequest<'a> {
    /// What the character attempts.
    pub action: &'a str,
    /// Current world.
    pub world: &'a WorldState,
    /// Campaign content.
    pub campaign: &'a CampaignStructure,
    /// Node the scene is set on.
    pub scene: Option<&'a SituationNode>,
    /// Acting character.
    pub character: &'a Character,
    /// Rules system.
    pub rules: RulesAdapter,
    /// Whether mechanics text should be produced.
    pub show_mechanics: bool,
}

/// Result of resolving an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    /// Narrative text shown to the players.
    pub text: String,
    /// Dice and rules text, when mechanics are visible.
    pub mechanics: Option<String>,
    /// World changes implied by the narration.
    pub patch: WorldStatePatch,
}

/// Input to answering a player question.
#[derive(Debug, Clone, Copy)]
pub struct QuestionRequest<'a> {
    /// The question.
    pub question: &'a str,
    /// Current world.
    pub world: &'a WorldState,
    /// Asking character, if one is bound.
    pub character: Option<&'a Character>,
}

/// Input to beat planning.
#[derive(Debug, Clone, Copy)]
pub struct BeatPlanRequest<'a> {
    /// Current world.
    pub world: &'a WorldState,
    /// Campaign content.
    pub campaign: &'a CampaignStructure,
    /// Number of the session being planned.
    pub session_number: u32,
}

/// Input to campaign generation.
#[derive(Debug, Clone, Copy)]
pub struct CampaignRequest<'a> {
    /// Setting description supplied by the host.
    pub setting: &'a str,
    /// Classified genre.
    pub category: SettingCategory,
    /// Player characters the campaign is built around.
    pub characters: &'a [Character],
}

/// The narration/classification oracle.
#[async_trait]
pub trait NarrativeOracle: Send + Sync {
    /// Classifies text into one of `request.labels`.
    async fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<OracleResponse<OracleLabel>, OracleError>;

    /// Decides whether an action needs explicit confirmation.
    async fn assess_consequences(
        &self,
        request: &ConsequenceRequest<'_>,
    ) -> Result<OracleResponse<ConsequenceAssessment>, OracleError>;

    /// Produces a short, low-latency acknowledgement of an action.
    async fn acknowledge(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError>;

    /// Resolves an action into narration and world changes.
    async fn resolve_action(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<Narration>, OracleError>;

    /// Answers an out-of-turn question.
    async fn answer_question(
        &self,
        request: &QuestionRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError>;

    /// Plans the beats of the next session.
    async fn plan_beats(
        &self,
        request: &BeatPlanRequest<'_>,
    ) -> Result<OracleResponse<Vec<Beat>>, OracleError>;

    /// Generates a campaign structure.
    async fn generate_campaign(
        &self,
        request: &CampaignRequest<'_>,
    ) -> Result<OracleResponse<CampaignStructure>, OracleError>;
}
