//! Classification Gateway: oracle classification with a deterministic
//! keyword fallback. Classification never fails outright.

pub mod keywords;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taleweaver_world_state::SettingCategory;
use tracing::{debug, warn};

use crate::oracle::{ClassificationKind, ClassificationRequest, NarrativeOracle};
use keywords::{KeywordScorer, KeywordTable};

/// Default minimum oracle confidence for intent classification.
pub const DEFAULT_INTENT_THRESHOLD: f64 = 0.65;

/// Default minimum oracle confidence for genre classification.
pub const DEFAULT_GENRE_THRESHOLD: f64 = 0.60;

/// A closed label set a classifier chooses from.
pub trait Category: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every label, in tie-break order.
    fn all() -> &'static [Self];

    /// Stable key used by keyword tables and the oracle.
    fn key(self) -> &'static str;

    /// Label used when nothing matches.
    fn fallback() -> Self;

    /// Parses a key, ignoring case, spaces, and hyphens.
    fn from_key(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
        Self::all().iter().copied().find(|c| c.key() == normalized)
    }
}

/// What the player meant by their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Something the character attempts; consumes the turn.
    Action,
    /// Something the player wants to know; never consumes the turn.
    Question,
}

impl Category for Intent {
    fn all() -> &'static [Self] {
        &[Self::Action, Self::Question]
    }

    fn key(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Question => "question",
        }
    }

    fn fallback() -> Self {
        Self::Action
    }
}

impl Category for SettingCategory {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn key(self) -> &'static str {
        SettingCategory::key(self)
    }

    fn fallback() -> Self {
        Self::Generic
    }
}

/// Which classifier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// The oracle, with confidence at or above the threshold.
    Oracle,
    /// The below-threshold path: the keyword scorer, or a weak oracle
    /// answer that still beat it.
    FallbackClassifier,
}

/// Outcome of a classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification<C> {
    /// Chosen label.
    pub label: C,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Why the label was chosen.
    pub reasoning: String,
    /// Which classifier produced it.
    pub source: Provenance,
}

/// Routes player input to an [`Intent`] and setting text to a
/// [`SettingCategory`].
pub struct ClassificationGateway {
    oracle: Option<Arc<dyn NarrativeOracle>>,
    intent: KeywordScorer<Intent>,
    setting: KeywordScorer<SettingCategory>,
    intent_threshold: f64,
    genre_threshold: f64,
}

impl fmt::Debug for ClassificationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationGateway")
            .field("has_oracle", &self.oracle.is_some())
            .field("intent_threshold", &self.intent_threshold)
            .field("genre_threshold", &self.genre_threshold)
            .finish_non_exhaustive()
    }
}

impl ClassificationGateway {
    /// Creates a gateway with the default thresholds.
    #[must_use]
    pub fn new(oracle: Option<Arc<dyn NarrativeOracle>>, table: &KeywordTable) -> Self {
        Self {
            oracle,
            intent: table.intent_scorer(),
            setting: table.setting_scorer(),
            intent_threshold: DEFAULT_INTENT_THRESHOLD,
            genre_threshold: DEFAULT_GENRE_THRESHOLD,
        }
    }

    /// Overrides the confidence thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, intent: f64, genre: f64) -> Self {
        self.intent_threshold = intent;
        self.genre_threshold = genre;
        self
    }

    /// Classifies player input as an action or a question.
    pub async fn classify_intent(&self, text: &str, context: &str) -> Classification<Intent> {
        self.classify(
            ClassificationKind::Intent,
            &self.intent,
            self.intent_threshold,
            text,
            context,
        )
        .await
    }

    /// Classifies a setting description into a genre.
    pub async fn classify_setting(&self, text: &str) -> Classification<SettingCategory> {
        self.classify(
            ClassificationKind::SettingGenre,
            &self.setting,
            self.genre_threshold,
            text,
            "",
        )
        .await
    }

    async fn classify<C: Category>(
        &self,
        kind: ClassificationKind,
        scorer: &KeywordScorer<C>,
        threshold: f64,
        text: &str,
        context: &str,
    ) -> Classification<C> {
        let from_oracle = self.ask_oracle::<C>(kind, text, context).await;

        if let Some(result) = &from_oracle {
            if result.confidence >= threshold {
                return result.clone();
            }
        }

        let scored = scorer.score(text);
        let fallback = Classification {
            label: scored.label,
            confidence: scored.confidence,
            reasoning: format!("{} keyword hit(s) for '{}'", scored.hits, scored.label.key()),
            source: Provenance::FallbackClassifier,
        };

        let chosen = match from_oracle {
            Some(oracle) if oracle.confidence > fallback.confidence => Classification {
                source: Provenance::FallbackClassifier,
                ..oracle
            },
            _ => fallback,
        };
        warn!(
            ?kind,
            label = chosen.label.key(),
            confidence = chosen.confidence,
            source = ?chosen.source,
            "oracle classification below threshold; fallback applied"
        );
        chosen
    }

    async fn ask_oracle<C: Category>(
        &self,
        kind: ClassificationKind,
        text: &str,
        context: &str,
    ) -> Option<Classification<C>> {
        let oracle = self.oracle.as_ref()?;
        let request = ClassificationRequest {
            kind,
            text,
            context,
            labels: C::all().iter().map(|c| c.key()).collect(),
        };
        let response = match oracle.classify(&request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(?kind, %error, "oracle classification failed");
                return None;
            }
        };
        let verdict = response.output;
        let Some(label) = C::from_key(&verdict.label) else {
            warn!(?kind, label = %verdict.label, "oracle returned an unknown label");
            return None;
        };
        debug!(?kind, label = label.key(), confidence = verdict.confidence, "oracle classified");
        Some(Classification {
            label,
            confidence: if verdict.confidence.is_finite() {
                verdict.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            reasoning: verdict.reasoning,
            source: Provenance::Oracle,
        })
    }
}
