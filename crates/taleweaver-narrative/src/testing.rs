//! Fixtures shared by this crate's unit tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use taleweaver_campaign::CampaignStructure;
use taleweaver_character::Character;
use taleweaver_world_state::{Beat, SettingCategory, WorldState};
use uuid::Uuid;

use crate::consequence::ConsequenceAssessment;
use crate::error::OracleError;
use crate::offline::{OfflineOracle, skeleton_campaign};
use crate::oracle::{
    BeatPlanRequest, CampaignRequest, ClassificationRequest, ConsequenceRequest, Narration,
    NarrationRequest, NarrativeOracle, OracleLabel, OracleResponse, QuestionRequest,
};

/// Oracle with canned classification and consequence answers. Everything
/// else is delegated to [`OfflineOracle`].
pub(crate) struct StubOracle {
    label: Result<OracleLabel, OracleError>,
    assessment: Result<ConsequenceAssessment, OracleError>,
}

impl StubOracle {
    pub(crate) fn labelled(label: &str, confidence: f64) -> Self {
        Self {
            label: Ok(OracleLabel {
                label: label.to_owned(),
                confidence,
                reasoning: "stub".to_owned(),
            }),
            assessment: Ok(ConsequenceAssessment::proceed()),
        }
    }

    pub(crate) fn failing(error: OracleError) -> Self {
        Self {
            label: Err(error.clone()),
            assessment: Err(error),
        }
    }

    pub(crate) fn assessing(assessment: ConsequenceAssessment) -> Self {
        Self {
            label: Err(OracleError::EmptyResponse),
            assessment: Ok(assessment),
        }
    }
}

#[async_trait]
impl NarrativeOracle for StubOracle {
    async fn classify(
        &self,
        _request: &ClassificationRequest<'_>,
    ) -> Result<OracleResponse<OracleLabel>, OracleError> {
        self.label.clone().map(|l| OracleResponse::new(l, 10))
    }

    async fn assess_consequences(
        &self,
        _request: &ConsequenceRequest<'_>,
    ) -> Result<OracleResponse<ConsequenceAssessment>, OracleError> {
        self.assessment.clone().map(|a| OracleResponse::new(a, 10))
    }

    async fn acknowledge(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError> {
        OfflineOracle.acknowledge(request).await
    }

    async fn resolve_action(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<Narration>, OracleError> {
        OfflineOracle.resolve_action(request).await
    }

    async fn answer_question(
        &self,
        request: &QuestionRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError> {
        OfflineOracle.answer_question(request).await
    }

    async fn plan_beats(
        &self,
        request: &BeatPlanRequest<'_>,
    ) -> Result<OracleResponse<Vec<Beat>>, OracleError> {
        OfflineOracle.plan_beats(request).await
    }

    async fn generate_campaign(
        &self,
        request: &CampaignRequest<'_>,
    ) -> Result<OracleResponse<CampaignStructure>, OracleError> {
        OfflineOracle.generate_campaign(request).await
    }
}

pub(crate) fn character(name: &str) -> Character {
    Character::new(Uuid::new_v4(), name, "A wary scout", "Eyes of the Old Road").unwrap()
}

pub(crate) fn campaign() -> CampaignStructure {
    skeleton_campaign("A drowned city", SettingCategory::Fantasy)
}

pub(crate) fn world() -> WorldState {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
    let mut world = WorldState::new(SettingCategory::Fantasy, now);
    let campaign = campaign();
    world.mirror_campaign(&campaign);
    world.enter_starting_scene(&campaign);
    world
}
