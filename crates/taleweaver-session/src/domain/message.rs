//! Chat log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A player.
    User,
    /// The game master.
    Assistant,
    /// The system itself, at session boundaries.
    System,
}

/// One entry of the append-only chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: Uuid,
    /// Author role.
    pub role: Role,
    /// Text.
    pub content: String,
    /// Display name of the author, if any.
    pub author: Option<String>,
    /// Dice and rules text attached to narration.
    pub mechanics: Option<String>,
    /// When the message was written.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message without mechanics.
    #[must_use]
    pub fn new(
        role: Role,
        content: impl Into<String>,
        author: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            author,
            mechanics: None,
            created_at,
        }
    }

    /// Attaches mechanics text.
    #[must_use]
    pub fn with_mechanics(mut self, mechanics: Option<String>) -> Self {
        self.mechanics = mechanics;
        self
    }
}
