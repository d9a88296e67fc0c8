//! Setting genre categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of setting genres a campaign can be classified into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingCategory {
    /// Swords, sorcery, and myth.
    Fantasy,
    /// Starships and strange worlds.
    ScienceFiction,
    /// Dread and the uncanny.
    Horror,
    /// Investigations and secrets.
    Mystery,
    /// Neon, chrome, and megacorps.
    Cyberpunk,
    /// Brass, steam, and empire.
    Steampunk,
    /// After the fall.
    PostApocalyptic,
    /// A real historical era.
    Historical,
    /// The present-day world.
    Modern,
    /// Capes and powers.
    Superhero,
    /// Frontier towns and outlaws.
    Western,
    /// No recognizable genre.
    #[default]
    Generic,
}

impl SettingCategory {
    /// Every category, `Generic` last.
    pub const ALL: [Self; 12] = [
        Self::Fantasy,
        Self::ScienceFiction,
        Self::Horror,
        Self::Mystery,
        Self::Cyberpunk,
        Self::Steampunk,
        Self::PostApocalyptic,
        Self::Historical,
        Self::Modern,
        Self::Superhero,
        Self::Western,
        Self::Generic,
    ];

    /// Stable key used in keyword tables and oracle labels.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Fantasy => "fantasy",
            Self::ScienceFiction => "science_fiction",
            Self::Horror => "horror",
            Self::Mystery => "mystery",
            Self::Cyberpunk => "cyberpunk",
            Self::Steampunk => "steampunk",
            Self::PostApocalyptic => "post_apocalyptic",
            Self::Historical => "historical",
            Self::Modern => "modern",
            Self::Superhero => "superhero",
            Self::Western => "western",
            Self::Generic => "generic",
        }
    }

    /// Parses a key, tolerating case, spaces, and hyphens.
    #[must_use]
    pub fn from_key(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|c| c.key() == normalized)
    }
}

impl fmt::Display for SettingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
