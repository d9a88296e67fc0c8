//! Live feed of committed session changes as server-sent events.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use taleweaver_core::repository::DocumentChanged;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Payload of one `session_changed` event.
#[derive(Debug, Serialize)]
pub struct ChangeNotice {
    /// The session that changed.
    pub session_id: Uuid,
    /// Version after the write; zero once the session is deleted.
    pub version: i64,
    /// Types of the events committed with the write.
    pub event_types: Vec<String>,
}

impl From<DocumentChanged> for ChangeNotice {
    fn from(change: DocumentChanged) -> Self {
        Self {
            session_id: change.id,
            version: change.version,
            event_types: change.events.into_iter().map(|e| e.event_type).collect(),
        }
    }
}

fn to_sse(notice: &ChangeNotice) -> Event {
    let name = if notice.version == 0 {
        "session_deleted"
    } else {
        "session_changed"
    };
    Event::default()
        .event(name)
        .data(serde_json::json!(notice).to_string())
}

/// GET /{session_id}/events
///
/// Readers that fall behind skip the missed notices; the next one carries
/// the current version, so refetching the session catches them up.
#[instrument(skip(state))]
async fn stream_changes(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = state.sessions.sessions.subscribe(session_id);
    state.sessions.sessions.load(session_id).await?;

    let changes = BroadcastStream::new(receiver).filter_map(move |change| match change {
        Ok(change) => Some(Ok(to_sse(&ChangeNotice::from(change)))),
        Err(lagged) => {
            debug!(%session_id, error = %lagged, "subscriber lagged");
            None
        }
    });

    Ok(Sse::new(changes).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

/// Returns the router for live session updates.
pub fn router() -> Router<AppState> {
    Router::new().route("/{session_id}/events", get(stream_changes))
}
