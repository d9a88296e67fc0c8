//! Session numbering and beat pacing.

use serde::{Deserialize, Serialize};

/// A planned narrative unit within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beat {
    /// Short title.
    pub title: String,
    /// What should happen.
    pub description: String,
    /// Pacing intensity, 1 (calm) to 5 (climactic).
    pub intensity: u8,
    /// What brings the beat about, if anything specific.
    pub trigger: Option<String>,
}

/// Where the campaign is in its sessions and the current session's beats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    /// One-based session number.
    pub current_session: u32,
    /// Zero-based index into `beats`.
    pub current_beat: u32,
    /// Beat plan for the current session; empty until planned.
    #[serde(default)]
    pub beats: Vec<Beat>,
}

impl Default for SessionProgress {
    fn default() -> Self {
        Self {
            current_session: 1,
            current_beat: 0,
            beats: Vec::new(),
        }
    }
}

impl SessionProgress {
    /// The beat the session is currently on.
    #[must_use]
    pub fn active_beat(&self) -> Option<&Beat> {
        self.beats.get(self.current_beat as usize)
    }

    /// Moves to the next beat, saturating at the last planned one.
    pub fn advance_beat(&mut self) {
        let last = u32::try_from(self.beats.len().saturating_sub(1)).unwrap_or(u32::MAX);
        if self.current_beat < last {
            self.current_beat += 1;
        }
    }

    /// Starts the next session with a fresh beat plan.
    pub fn begin_next_session(&mut self, beats: Vec<Beat>) {
        self.current_session += 1;
        self.current_beat = 0;
        self.beats = beats;
    }
}
