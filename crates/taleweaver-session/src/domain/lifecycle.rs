//! Setup steps and session status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a session is in its setup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    /// Setting is being written.
    Create,
    /// Setting summary is being reviewed.
    Summary,
    /// Characters are being created.
    Characters,
    /// The game is running.
    Play,
}

impl SetupStep {
    /// The step that follows this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Create => Some(Self::Summary),
            Self::Summary => Some(Self::Characters),
            Self::Characters => Some(Self::Play),
            Self::Play => None,
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Summary => "summary",
            Self::Characters => "characters",
            Self::Play => "play",
        })
    }
}

/// Lifecycle status of a session.
///
/// `Finished` is terminal. A paused session returns to `Active` only by
/// starting the next session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Turns are progressing.
    #[default]
    Active,
    /// Turn progression is frozen.
    Paused,
    /// The campaign has ended.
    Finished,
}

/// Why a session was paused; kept for pacing the next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// The session reached a natural stopping point.
    Natural,
    /// Play was cut off mid-scene.
    Interrupted,
    /// The players stopped before the planned end.
    Early,
    /// Nobody acted for longer than the idle timeout.
    IdleTimeout,
}
