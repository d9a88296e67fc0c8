//! Tunables for the action resolution pipeline.

use taleweaver_narrative::{DEFAULT_GENRE_THRESHOLD, DEFAULT_INTENT_THRESHOLD, RulesAdapter};

/// Default number of compare-and-swap retries before a write gives up.
pub const DEFAULT_COMMIT_RETRY_LIMIT: u32 = 3;

/// Pipeline configuration shared by every session.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Minimum oracle confidence for intent classification.
    pub intent_threshold: f64,
    /// Minimum oracle confidence for setting-genre classification.
    pub genre_threshold: f64,
    /// Retries after a version conflict on write-back.
    pub commit_retry_limit: u32,
    /// Rules system handed to the narration oracle.
    pub rules: RulesAdapter,
    /// Whether narration includes mechanics text.
    pub show_mechanics: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            intent_threshold: DEFAULT_INTENT_THRESHOLD,
            genre_threshold: DEFAULT_GENRE_THRESHOLD,
            commit_retry_limit: DEFAULT_COMMIT_RETRY_LIMIT,
            rules: RulesAdapter::FateCore,
            show_mechanics: false,
        }
    }
}
