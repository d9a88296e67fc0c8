//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use taleweaver_core::clock::Clock;
use taleweaver_narrative::NarrativeOracle;
use taleweaver_session::application::repository::CampaignDocument;
use taleweaver_session::{PipelineConfig, SessionContext};
use taleweaver_store::memory::InMemoryDocumentStore;
use taleweaver_test_support::{FixedClock, ScriptedOracle, fixed_now, sample_campaign};
use tower::ServiceExt;
use uuid::Uuid;

use taleweaver_api::state::AppState;

/// A running app over an in-memory store, with handles to its parts.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub oracle: Arc<ScriptedOracle>,
}

impl TestApp {
    /// Router clone for a single request.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full app router with an in-memory store, a fixed clock, and an
/// oracle that behaves like the offline one.
pub fn build_test_app() -> TestApp {
    build_test_app_with_oracle(ScriptedOracle::new())
}

/// Build the full app router around a scripted oracle.
pub fn build_test_app_with_oracle(oracle: ScriptedOracle) -> TestApp {
    let oracle = Arc::new(oracle);
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(fixed_now()));
    let sessions = SessionContext::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::clone(&oracle) as Arc<dyn NarrativeOracle>,
        clock,
        PipelineConfig::default(),
    );
    let state = AppState::new(sessions);
    TestApp {
        router: taleweaver_api::app(state.clone()),
        state,
        oracle,
    }
}

/// Stores the sample campaign for `session_id`, skipping background
/// generation.
pub async fn seed_campaign(app: &TestApp, session_id: Uuid) {
    let mut document = CampaignDocument {
        session_id,
        structure: sample_campaign(),
        generated_at: fixed_now(),
        version: 0,
    };
    app.state.sessions.campaigns.save(&mut document).await.unwrap();
}

async fn send(
    app: Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request as `user` with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    user: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(user), Some(body)).await
}

/// Send a POST request as `user` without a body.
pub async fn post_empty(app: Router, uri: &str, user: &str) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(user), None).await
}

/// Send a PUT request as `user` with a JSON body.
pub async fn put_json(
    app: Router,
    uri: &str,
    user: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "PUT", uri, Some(user), Some(body)).await
}

/// Send a DELETE request as `user`.
pub async fn delete(app: Router, uri: &str, user: &str) -> (StatusCode, serde_json::Value) {
    send(app, "DELETE", uri, Some(user), None).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None, None).await
}

/// Send a GET request as `user`.
pub async fn get_json_as(app: Router, uri: &str, user: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, Some(user), None).await
}

/// Creates a session owned by `owner` and returns its id.
pub async fn create_session(app: &TestApp, owner: &str, multiplayer: bool) -> Uuid {
    let (status, json) = post_json(
        app.router(),
        "/api/v1/sessions",
        owner,
        &serde_json::json!({
            "setting": "A drowned kingdom of canals and bells",
            "multiplayer": multiplayer,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["session_id"].as_str().unwrap().parse().unwrap()
}

/// Walks a new session through setup into play with the given characters.
/// Returns the session id and the character ids in creation order.
pub async fn session_in_play(
    app: &TestApp,
    owner: &str,
    multiplayer: bool,
    names: &[&str],
) -> (Uuid, Vec<Uuid>) {
    let session_id = create_session(app, owner, multiplayer).await;
    let base = format!("/api/v1/sessions/{session_id}");

    for to in ["summary", "characters"] {
        let (status, json) = post_json(
            app.router(),
            &format!("{base}/advance-step"),
            owner,
            &serde_json::json!({ "to": to }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
    }

    for name in names {
        let (status, json) = post_json(
            app.router(),
            &format!("{base}/characters"),
            owner,
            &serde_json::json!({
                "name": name,
                "description": format!("{name} of the canals"),
                "aspect": "Restless Wanderer",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
    }

    seed_campaign(app, session_id).await;
    let (status, json) = post_empty(app.router(), &format!("{base}/begin-play"), owner).await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let (_, view) = get_json(app.router(), &base).await;
    let character_ids = view["world_state"]["characters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().parse().unwrap())
        .collect();
    (session_id, character_ids)
}
