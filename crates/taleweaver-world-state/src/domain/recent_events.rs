//! Bounded, newest-first log of recent narrative events.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum number of retained events.
pub const MAX_RECENT_EVENTS: usize = 5;

/// Ring buffer of the last [`MAX_RECENT_EVENTS`] events, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RecentEvents(VecDeque<String>);

impl RecentEvents {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `event` as the newest entry, evicting the oldest past the bound.
    pub fn push(&mut self, event: impl Into<String>) {
        self.0.push_front(event.into());
        self.0.truncate(MAX_RECENT_EVENTS);
    }

    /// The newest event.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.0.front().map(String::as_str)
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for RecentEvents {
    fn from(mut events: Vec<String>) -> Self {
        events.truncate(MAX_RECENT_EVENTS);
        Self(events.into())
    }
}

impl From<RecentEvents> for Vec<String> {
    fn from(events: RecentEvents) -> Self {
        events.0.into()
    }
}
