//! Taleweaver: HTTP surface of the game master engine.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1/sessions",
            routes::session::router()
                .merge(routes::campaign::router())
                .merge(routes::events::router()),
        )
        .with_state(state)
}
