//! Shared application state.

use taleweaver_session::SessionContext;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session handlers' dependencies.
    pub sessions: SessionContext,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(sessions: SessionContext) -> Self {
        Self { sessions }
    }
}
