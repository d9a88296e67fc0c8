//! Player characters and slot bindings.

use serde::{Deserialize, Serialize};
use taleweaver_core::identity::UserId;
use thiserror::Error;
use uuid::Uuid;

use super::stats::CharacterStats;

/// Errors raised by character operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CharacterError {
    /// Characters must be named.
    #[error("character name must not be empty")]
    EmptyName,

    /// Another user already plays this character.
    #[error("character {character_id} is already claimed by {claimed_by}")]
    AlreadyClaimed {
        /// The contested character.
        character_id: Uuid,
        /// The current owner.
        claimed_by: UserId,
    },
}

/// Optional demographic details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    /// Age or age bracket.
    pub age: Option<String>,
    /// Gender.
    pub gender: Option<String>,
    /// Pronouns.
    pub pronouns: Option<String>,
    /// Species or ancestry.
    pub ancestry: Option<String>,
}

/// A player character.
///
/// Identity is fixed once play starts; only `description` drifts with the
/// narrative. `player_id` is the multiplayer slot binding and stays `None`
/// in hot-seat games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Character identifier; doubles as the slot id in multiplayer games.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// High concept aspect.
    pub aspect: String,
    /// Name of the person at the table.
    pub player_name: Option<String>,
    /// User bound to this slot.
    pub player_id: Option<UserId>,
    /// Archetype chosen at creation.
    pub archetype: Option<String>,
    /// Demographic details.
    #[serde(default)]
    pub demographics: Demographics,
    /// Skills and stunts.
    #[serde(default)]
    pub stats: CharacterStats,
}

impl Character {
    /// Creates an unclaimed character.
    ///
    /// # Errors
    ///
    /// Returns `CharacterError::EmptyName` if `name` is blank.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        aspect: impl Into<String>,
    ) -> Result<Self, CharacterError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CharacterError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            description: description.into(),
            aspect: aspect.into(),
            player_name: None,
            player_id: None,
            archetype: None,
            demographics: Demographics::default(),
            stats: CharacterStats::default(),
        })
    }

    /// Whether any user holds this slot.
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.player_id.is_some()
    }

    /// Whether `user` holds this slot.
    #[must_use]
    pub fn is_claimed_by(&self, user: &UserId) -> bool {
        self.player_id.as_ref() == Some(user)
    }

    /// Binds the slot to `user`. Re-claiming one's own slot is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CharacterError::AlreadyClaimed` if another user holds it.
    pub fn claim(&mut self, user: &UserId) -> Result<(), CharacterError> {
        match &self.player_id {
            Some(owner) if owner != user => Err(CharacterError::AlreadyClaimed {
                character_id: self.id,
                claimed_by: owner.clone(),
            }),
            _ => {
                self.player_id = Some(user.clone());
                Ok(())
            }
        }
    }

    /// Clears the slot binding, returning the previous owner.
    pub fn release(&mut self) -> Option<UserId> {
        self.player_id.take()
    }
}
