//! Play modes and whose turn it is.

use serde::{Deserialize, Serialize};
use taleweaver_core::identity::UserId;
use uuid::Uuid;

/// How players share a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayMode {
    /// One device, characters take turns with an explicit handoff.
    HotSeat,
    /// Several users, each bound to character slots.
    Multiplayer {
        /// User allowed to kick, pause, and finish.
        host_id: UserId,
    },
}

impl PlayMode {
    /// Whether this is a multiplayer session.
    #[must_use]
    pub fn is_multiplayer(&self) -> bool {
        matches!(self, Self::Multiplayer { .. })
    }
}

/// Turn coordinator state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "character_id", rename_all = "snake_case")]
pub enum TurnState {
    /// Play has not begun.
    #[default]
    NotStarted,
    /// The character may act.
    Active(Uuid),
    /// The character is up next but the device has not been handed over.
    PendingHandoff(Uuid),
}

impl TurnState {
    /// Character whose turn it is, acknowledged or not.
    #[must_use]
    pub fn character_id(self) -> Option<Uuid> {
        match self {
            Self::NotStarted => None,
            Self::Active(id) | Self::PendingHandoff(id) => Some(id),
        }
    }
}

/// Character after `current` in list order, wrapping around.
///
/// Falls back to the first character when `current` is no longer listed.
#[must_use]
pub fn next_in_rotation(order: &[Uuid], current: Uuid) -> Option<Uuid> {
    if order.is_empty() {
        return None;
    }
    let next = order
        .iter()
        .position(|id| *id == current)
        .map_or(0, |index| (index + 1) % order.len());
    order.get(next).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps_to_first() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

        assert_eq!(next_in_rotation(&ids, ids[0]), Some(ids[1]));
        assert_eq!(next_in_rotation(&ids, ids[2]), Some(ids[0]));
    }

    #[test]
    fn test_rotation_of_single_character_stays_put() {
        let id = Uuid::new_v4();
        assert_eq!(next_in_rotation(&[id], id), Some(id));
    }

    #[test]
    fn test_rotation_with_unknown_current_starts_over() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        assert_eq!(next_in_rotation(&ids, Uuid::new_v4()), Some(ids[0]));
        assert_eq!(next_in_rotation(&[], ids[0]), None);
    }

    #[test]
    fn test_turn_state_serializes_with_character() {
        let id = Uuid::nil();

        let json = serde_json::to_value(TurnState::PendingHandoff(id)).unwrap();

        assert_eq!(json["state"], "pending_handoff");
        assert_eq!(json["character_id"], id.to_string());
    }
}
