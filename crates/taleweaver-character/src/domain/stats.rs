//! Skills and stunts.

use serde::{Deserialize, Serialize};

/// A rated skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Skill name, e.g. "Notice".
    pub name: String,
    /// Ladder rating.
    pub rank: i8,
}

/// A stunt granting a narrow mechanical benefit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stunt {
    /// Stunt name.
    pub name: String,
    /// Rules text.
    pub description: String,
}

/// Mechanical stats attached to a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    /// Skills, highest first.
    pub skills: Vec<Skill>,
    /// Stunts.
    pub stunts: Vec<Stunt>,
}

impl CharacterStats {
    /// Returns the rating of a skill, matched case-insensitively. Unlisted
    /// skills are rated 0 (Mediocre).
    #[must_use]
    pub fn rank_of(&self, skill: &str) -> i8 {
        self.skills
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(skill))
            .map_or(0, |s| s.rank)
    }

    /// The highest rated skill, if any.
    #[must_use]
    pub fn apex_skill(&self) -> Option<&Skill> {
        self.skills.iter().max_by_key(|s| s.rank)
    }
}
