//! Faction threat clocks.

use serde::{Deserialize, Serialize};

/// Number of segments on a standard faction clock.
pub const CLOCK_SEGMENTS: u8 = 4;

/// A bounded progress counter tracking a faction's escalating threat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionClock {
    /// Filled segments, `0..=max`.
    pub value: u8,
    /// Segment count.
    pub max: u8,
    /// What the faction achieves when the clock fills.
    pub objective: String,
    /// One description per segment, in fill order.
    pub steps: Vec<String>,
}

/// Outcome of advancing a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAdvance {
    /// Value before the advance.
    pub from: u8,
    /// Value after the advance.
    pub to: u8,
    /// Whether this advance filled the clock.
    pub filled: bool,
}

impl FactionClock {
    /// Creates an empty four-segment clock.
    #[must_use]
    pub fn new(objective: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            value: 0,
            max: CLOCK_SEGMENTS,
            objective: objective.into(),
            steps,
        }
    }

    /// Fills up to `segments` more segments, saturating at `max`.
    pub fn advance(&mut self, segments: u8) -> ClockAdvance {
        let from = self.value;
        self.value = self.value.saturating_add(segments).min(self.max);
        ClockAdvance {
            from,
            to: self.value,
            filled: from < self.max && self.value == self.max,
        }
    }

    /// Whether every segment is filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.value >= self.max
    }

    /// Description of the most recently filled segment.
    #[must_use]
    pub fn current_step(&self) -> Option<&str> {
        let index = usize::from(self.value).checked_sub(1)?;
        self.steps.get(index).map(String::as_str)
    }
}
