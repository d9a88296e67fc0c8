//! Consequence Gate: decides whether an action needs explicit confirmation
//! before it is committed.
//!
//! There is no deterministic fallback. An unreachable oracle is an error the
//! caller surfaces as retryable; the gate never guesses.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taleweaver_character::Character;
use taleweaver_world_state::WorldState;
use tracing::{debug, instrument};

use crate::error::OracleError;
use crate::oracle::{ConsequenceRequest, NarrativeOracle};

/// Message shown when the oracle flags an action without explaining why.
pub const DEFAULT_CONFIRMATION_MESSAGE: &str =
    "This action could change the story in ways that cannot be taken back. Proceed?";

/// How consequential an action is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsequenceCategory {
    /// Everyday action.
    #[default]
    Routine,
    /// Dangerous but ordinary for an adventurer.
    Risky,
    /// Cannot be undone in the fiction.
    Irreversible,
    /// Crosses a moral line.
    MorallySignificant,
    /// Changes the world for everyone.
    WorldAltering,
    /// Abandons the current situation for something unrelated.
    MajorDetour,
}

impl ConsequenceCategory {
    /// Whether actions of this category always need confirmation.
    #[must_use]
    pub fn requires_confirmation(self) -> bool {
        !matches!(self, Self::Routine | Self::Risky)
    }
}

/// The gate's verdict for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsequenceAssessment {
    /// Whether the player must confirm first.
    pub needs_confirmation: bool,
    /// What to ask the player.
    pub confirmation_message: Option<String>,
    /// Oracle categorization.
    #[serde(default)]
    pub category: ConsequenceCategory,
}

impl ConsequenceAssessment {
    /// An assessment that lets the action through.
    #[must_use]
    pub fn proceed() -> Self {
        Self::default()
    }
}

/// Stateless, advisory gate in front of action resolution.
#[derive(Clone)]
pub struct ConsequenceGate {
    oracle: Arc<dyn NarrativeOracle>,
}

impl fmt::Debug for ConsequenceGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsequenceGate").finish_non_exhaustive()
    }
}

impl ConsequenceGate {
    /// Creates a gate backed by `oracle`.
    #[must_use]
    pub fn new(oracle: Arc<dyn NarrativeOracle>) -> Self {
        Self { oracle }
    }

    /// Assesses one attempted action.
    ///
    /// A category that always requires confirmation forces
    /// `needs_confirmation`, whatever flag the oracle set.
    ///
    /// # Errors
    ///
    /// Returns the oracle's error unchanged.
    #[instrument(skip_all, fields(character_id = %character.id))]
    pub async fn assess(
        &self,
        action: &str,
        world: &WorldState,
        character: &Character,
    ) -> Result<ConsequenceAssessment, OracleError> {
        let request = ConsequenceRequest {
            action,
            world,
            character,
        };
        let mut assessment = self.oracle.assess_consequences(&request).await?.output;

        assessment.needs_confirmation |= assessment.category.requires_confirmation();
        if assessment.needs_confirmation {
            let missing = assessment
                .confirmation_message
                .as_deref()
                .is_none_or(|m| m.trim().is_empty());
            if missing {
                assessment.confirmation_message = Some(DEFAULT_CONFIRMATION_MESSAGE.to_owned());
            }
        } else {
            assessment.confirmation_message = None;
        }

        debug!(
            needs_confirmation = assessment.needs_confirmation,
            category = ?assessment.category,
            "consequences assessed"
        );
        Ok(assessment)
    }
}
