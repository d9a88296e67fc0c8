//! Taleweaver: Narrative bounded context.
//!
//! Everything that talks to the narration/classification oracle: the
//! oracle port itself, the classification gateway with its deterministic
//! keyword fallback, the consequence gate, and an offline oracle used when
//! no model backend is configured.

pub mod classification;
pub mod consequence;
pub mod error;
pub mod offline;
pub mod oracle;

#[cfg(test)]
mod testing;

pub use classification::{
    Category, Classification, ClassificationGateway, DEFAULT_GENRE_THRESHOLD,
    DEFAULT_INTENT_THRESHOLD, Intent, Provenance,
    keywords::{KeywordScorer, KeywordTable},
};
pub use consequence::{ConsequenceAssessment, ConsequenceCategory, ConsequenceGate};
pub use error::OracleError;
pub use offline::{OfflineOracle, skeleton_campaign};
pub use oracle::{
    BeatPlanRequest, CampaignRequest, ClassificationKind, ClassificationRequest,
    ConsequenceRequest, Narration, NarrationRequest, NarrativeOracle, OracleLabel,
    OracleResponse, QuestionRequest, RulesAdapter,
};
