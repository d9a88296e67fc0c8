//! A configurable `NarrativeOracle` for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use taleweaver_campaign::CampaignStructure;
use taleweaver_narrative::{
    BeatPlanRequest, CampaignRequest, ClassificationRequest, ConsequenceAssessment,
    ConsequenceRequest, Narration, NarrationRequest, NarrativeOracle, OfflineOracle, OracleError,
    OracleLabel, OracleResponse, QuestionRequest,
};
use taleweaver_world_state::Beat;
use tokio::sync::Barrier;

/// How often each oracle operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleCalls {
    /// `classify`.
    pub classify: usize,
    /// `assess_consequences`.
    pub assess_consequences: usize,
    /// `acknowledge`.
    pub acknowledge: usize,
    /// `resolve_action`.
    pub resolve_action: usize,
    /// `answer_question`.
    pub answer_question: usize,
    /// `plan_beats`.
    pub plan_beats: usize,
    /// `generate_campaign`.
    pub generate_campaign: usize,
}

#[derive(Debug, Default)]
struct Counters {
    classify: AtomicUsize,
    assess_consequences: AtomicUsize,
    acknowledge: AtomicUsize,
    resolve_action: AtomicUsize,
    answer_question: AtomicUsize,
    plan_beats: AtomicUsize,
    generate_campaign: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// An oracle whose answers are set up front. Anything not scripted is
/// answered by [`OfflineOracle`].
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    label: Option<OracleLabel>,
    assessment: Option<ConsequenceAssessment>,
    narration: Option<Narration>,
    campaign: Option<CampaignStructure>,
    beats: Option<Vec<Beat>>,
    classify_error: Option<OracleError>,
    resolution_error: Option<OracleError>,
    beats_error: Option<OracleError>,
    campaign_error: Option<OracleError>,
    resolution_barrier: Option<Arc<Barrier>>,
    counters: Counters,
}

impl ScriptedOracle {
    /// An oracle that behaves like [`OfflineOracle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every classification returns `label` with `confidence`.
    #[must_use]
    pub fn with_label(mut self, label: &str, confidence: f64) -> Self {
        self.label = Some(OracleLabel {
            label: label.to_owned(),
            confidence,
            reasoning: "scripted".to_owned(),
        });
        self
    }

    /// Every consequence assessment returns `assessment`.
    #[must_use]
    pub fn with_assessment(mut self, assessment: ConsequenceAssessment) -> Self {
        self.assessment = Some(assessment);
        self
    }

    /// Every resolution returns `narration`.
    #[must_use]
    pub fn with_narration(mut self, narration: Narration) -> Self {
        self.narration = Some(narration);
        self
    }

    /// Campaign generation returns `campaign`.
    #[must_use]
    pub fn with_campaign(mut self, campaign: CampaignStructure) -> Self {
        self.campaign = Some(campaign);
        self
    }

    /// Beat planning returns `beats`.
    #[must_use]
    pub fn with_beats(mut self, beats: Vec<Beat>) -> Self {
        self.beats = Some(beats);
        self
    }

    /// Classification fails with `error`.
    #[must_use]
    pub fn failing_classification(mut self, error: OracleError) -> Self {
        self.classify_error = Some(error);
        self
    }

    /// Acknowledgement and resolution fail with `error`.
    #[must_use]
    pub fn failing_resolution(mut self, error: OracleError) -> Self {
        self.resolution_error = Some(error);
        self
    }

    /// Beat planning fails with `error`.
    #[must_use]
    pub fn failing_beats(mut self, error: OracleError) -> Self {
        self.beats_error = Some(error);
        self
    }

    /// Campaign generation fails with `error`.
    #[must_use]
    pub fn failing_campaign(mut self, error: OracleError) -> Self {
        self.campaign_error = Some(error);
        self
    }

    /// Every resolution waits on `barrier` before answering, so concurrent
    /// submissions can be lined up to reach the write together.
    #[must_use]
    pub fn with_resolution_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.resolution_barrier = Some(barrier);
        self
    }

    /// Snapshot of the call counts.
    #[must_use]
    pub fn calls(&self) -> OracleCalls {
        let c = &self.counters;
        OracleCalls {
            classify: c.classify.load(Ordering::SeqCst),
            assess_consequences: c.assess_consequences.load(Ordering::SeqCst),
            acknowledge: c.acknowledge.load(Ordering::SeqCst),
            resolve_action: c.resolve_action.load(Ordering::SeqCst),
            answer_question: c.answer_question.load(Ordering::SeqCst),
            plan_beats: c.plan_beats.load(Ordering::SeqCst),
            generate_campaign: c.generate_campaign.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl NarrativeOracle for ScriptedOracle {
    async fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<OracleResponse<OracleLabel>, OracleError> {
        bump(&self.counters.classify);
        if let Some(error) = &self.classify_error {
            return Err(error.clone());
        }
        match &self.label {
            Some(label) => Ok(OracleResponse::new(label.clone(), 5)),
            None => OfflineOracle.classify(request).await,
        }
    }

    async fn assess_consequences(
        &self,
        request: &ConsequenceRequest<'_>,
    ) -> Result<OracleResponse<ConsequenceAssessment>, OracleError> {
        bump(&self.counters.assess_consequences);
        match &self.assessment {
            Some(assessment) => Ok(OracleResponse::new(assessment.clone(), 5)),
            None => OfflineOracle.assess_consequences(request).await,
        }
    }

    async fn acknowledge(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError> {
        bump(&self.counters.acknowledge);
        if let Some(error) = &self.resolution_error {
            return Err(error.clone());
        }
        OfflineOracle.acknowledge(request).await
    }

    async fn resolve_action(
        &self,
        request: &NarrationRequest<'_>,
    ) -> Result<OracleResponse<Narration>, OracleError> {
        bump(&self.counters.resolve_action);
        if let Some(barrier) = &self.resolution_barrier {
            barrier.wait().await;
        }
        if let Some(error) = &self.resolution_error {
            return Err(error.clone());
        }
        match &self.narration {
            Some(narration) => Ok(OracleResponse::new(narration.clone(), 20)),
            None => OfflineOracle.resolve_action(request).await,
        }
    }

    async fn answer_question(
        &self,
        request: &QuestionRequest<'_>,
    ) -> Result<OracleResponse<String>, OracleError> {
        bump(&self.counters.answer_question);
        OfflineOracle.answer_question(request).await
    }

    async fn plan_beats(
        &self,
        request: &BeatPlanRequest<'_>,
    ) -> Result<OracleResponse<Vec<Beat>>, OracleError> {
        bump(&self.counters.plan_beats);
        if let Some(error) = &self.beats_error {
            return Err(error.clone());
        }
        match &self.beats {
            Some(beats) => Ok(OracleResponse::new(beats.clone(), 20)),
            None => OfflineOracle.plan_beats(request).await,
        }
    }

    async fn generate_campaign(
        &self,
        request: &CampaignRequest<'_>,
    ) -> Result<OracleResponse<CampaignStructure>, OracleError> {
        bump(&self.counters.generate_campaign);
        if let Some(error) = &self.campaign_error {
            return Err(error.clone());
        }
        match &self.campaign {
            Some(campaign) => Ok(OracleResponse::new(campaign.clone(), 50)),
            None => OfflineOracle.generate_campaign(request).await,
        }
    }
}
