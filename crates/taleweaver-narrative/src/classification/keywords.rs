//! Data-driven keyword table and the single scoring function shared by
//! every classifier.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use super::{Category, Intent};
use taleweaver_world_state::SettingCategory;

const BUILTIN: &str = include_str!("keywords.yaml");

/// Words per unit of length penalty in the score denominator.
const WORDS_PER_PENALTY: f64 = 10.0;

/// Category → keyword lists, grouped by classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    /// Keywords for intent classification, keyed by [`Intent::key`].
    pub intent: BTreeMap<String, Vec<String>>,
    /// Keywords for genre classification, keyed by [`SettingCategory::key`].
    pub setting: BTreeMap<String, Vec<String>>,
}

impl KeywordTable {
    /// Parses a table from YAML.
    ///
    /// # Errors
    ///
    /// Returns the YAML error when the document does not match the table shape.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// The table shipped with the binary.
    ///
    /// # Panics
    ///
    /// Never in practice: the embedded document is checked by the test suite.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_yaml(BUILTIN).expect("embedded keyword table is valid YAML")
    }

    /// Scorer for player intent.
    #[must_use]
    pub fn intent_scorer(&self) -> KeywordScorer<Intent> {
        KeywordScorer::from_map(&self.intent)
    }

    /// Scorer for setting genre.
    #[must_use]
    pub fn setting_scorer(&self) -> KeywordScorer<SettingCategory> {
        KeywordScorer::from_map(&self.setting)
    }
}

/// Result of keyword scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordScore<C> {
    /// Best category, or the fallback when nothing matched.
    pub label: C,
    /// Score in `[0, 1]`.
    pub confidence: f64,
    /// Keyword hits for `label`.
    pub hits: usize,
}

/// Deterministic classifier over a fixed category set.
#[derive(Debug, Clone)]
pub struct KeywordScorer<C> {
    /// Keywords per category, split into words, in `C::all()` order.
    keywords: Vec<(C, Vec<Vec<String>>)>,
}

impl<C: Category> KeywordScorer<C> {
    /// Builds a scorer from a `key → keywords` map. Unknown keys are skipped.
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, Vec<String>>) -> Self {
        for key in map.keys() {
            if C::from_key(key).is_none() {
                warn!(key = %key, "keyword table entry for unknown category ignored");
            }
        }

        let keywords = C::all()
            .iter()
            .map(|&category| {
                let phrases = map
                    .iter()
                    .filter(|(key, _)| C::from_key(key) == Some(category))
                    .flat_map(|(_, phrases)| phrases.iter())
                    .map(|phrase| tokenize(phrase))
                    .filter(|words| !words.is_empty())
                    .collect();
                (category, phrases)
            })
            .collect();
        Self { keywords }
    }

    /// Scores `text` against every category.
    ///
    /// The score of a category is its keyword hits divided by
    /// `1 + words / 10`, capped at 1. The highest score wins; ties go to the
    /// category listed first. No hits at all yields the fallback category
    /// with confidence 0.
    #[must_use]
    pub fn score(&self, text: &str) -> KeywordScore<C> {
        let words = tokenize(text);
        #[allow(clippy::cast_precision_loss)]
        let denominator = 1.0 + words.len() as f64 / WORDS_PER_PENALTY;

        let mut best = KeywordScore {
            label: C::fallback(),
            confidence: 0.0,
            hits: 0,
        };
        for (category, phrases) in &self.keywords {
            let hits: usize = phrases.iter().map(|p| count_occurrences(&words, p)).sum();
            if hits == 0 {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let confidence = (hits as f64 / denominator).min(1.0);
            if best.hits == 0 || confidence > best.confidence {
                best = KeywordScore {
                    label: *category,
                    confidence,
                    hits,
                };
            }
        }
        best
    }
}

/// Lower-cases `text` and splits it into words. `?` and `!` become their own
/// tokens; every other non-alphanumeric character separates words.
fn tokenize(text: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(text.len() + 8);
    for ch in text.chars().flat_map(char::to_lowercase) {
        match ch {
            '?' | '!' => {
                spaced.push(' ');
                spaced.push(ch);
                spaced.push(' ');
            }
            c if c.is_alphanumeric() || c == '\'' => spaced.push(c),
            _ => spaced.push(' '),
        }
    }
    spaced.split_whitespace().map(str::to_owned).collect()
}

fn count_occurrences(words: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() || phrase.len() > words.len() {
        return 0;
    }
    words
        .windows(phrase.len())
        .filter(|window| window == &phrase)
        .count()
}
