//! Taleweaver: Character bounded context.
//!
//! Player characters, their Fate-style stats, and the multiplayer slot
//! binding between a character and the user who plays it.

pub mod domain;

pub use domain::character::{Character, CharacterError, Demographics};
pub use domain::stats::{CharacterStats, Skill, Stunt};
