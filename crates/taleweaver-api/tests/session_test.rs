//! Integration tests for session setup, listing, and deletion.

mod common;

use axum::http::StatusCode;
use uuid::Uuid;

#[tokio::test]
async fn test_create_session_round_trip() {
    let app = common::build_test_app();

    let session_id = common::create_session(&app, "alice", false).await;

    let (status, json) =
        common::get_json(app.router(), &format!("/api/v1/sessions/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_id"], session_id.to_string());
    assert_eq!(json["owner_id"], "alice");
    assert_eq!(json["step"], "create");
    assert_eq!(json["status"], "active");
    assert_eq!(json["mode"]["kind"], "hot_seat");
    assert_eq!(json["world_state"]["setting_category"], "fantasy");
    assert_eq!(json["can_undo"], false);
    assert_eq!(json["version"], 1);
}

#[tokio::test]
async fn test_create_session_with_blank_setting_returns_400() {
    let app = common::build_test_app();

    let (status, json) = common::post_json(
        app.router(),
        "/api/v1/sessions",
        "alice",
        &serde_json::json!({ "setting": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_setup_flow_reaches_play_on_starting_node() {
    let app = common::build_test_app();

    let (session_id, characters) =
        common::session_in_play(&app, "alice", false, &["Mara", "Ilsa"]).await;

    let (status, json) =
        common::get_json(app.router(), &format!("/api/v1/sessions/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["step"], "play");
    assert_eq!(json["turn"]["state"], "active");
    assert_eq!(json["turn"]["character_id"], characters[0].to_string());
    assert_eq!(json["world_state"]["current_scene"]["node_id"], "node-1");
    assert_eq!(json["message_count"], 1);
}

#[tokio::test]
async fn test_skipping_a_setup_step_returns_409() {
    let app = common::build_test_app();
    let session_id = common::create_session(&app, "alice", false).await;

    let (status, json) = common::post_json(
        app.router(),
        &format!("/api/v1/sessions/{session_id}/advance-step"),
        "alice",
        &serde_json::json!({ "to": "characters" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "wrong_step");
}

#[tokio::test]
async fn test_begin_play_without_campaign_returns_400() {
    let app = common::build_test_app();
    let session_id = common::create_session(&app, "alice", false).await;
    let base = format!("/api/v1/sessions/{session_id}");
    for to in ["summary", "characters"] {
        common::post_json(
            app.router(),
            &format!("{base}/advance-step"),
            "alice",
            &serde_json::json!({ "to": to }),
        )
        .await;
    }
    common::post_json(
        app.router(),
        &format!("{base}/characters"),
        "alice",
        &serde_json::json!({ "name": "Mara" }),
    )
    .await;

    let (status, json) =
        common::post_empty(app.router(), &format!("{base}/begin-play"), "alice").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");
}

#[tokio::test]
async fn test_non_owner_cannot_advance_setup() {
    let app = common::build_test_app();
    let session_id = common::create_session(&app, "alice", true).await;

    let (status, json) = common::post_json(
        app.router(),
        &format!("/api/v1/sessions/{session_id}/advance-step"),
        "mallory",
        &serde_json::json!({ "to": "summary" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn test_list_sessions_shows_only_own_sessions() {
    let app = common::build_test_app();
    let mine = common::create_session(&app, "alice", false).await;
    common::create_session(&app, "bob", false).await;

    let (status, json) = common::get_json_as(app.router(), "/api/v1/sessions", "alice").await;

    assert_eq!(status, StatusCode::OK);
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["session_id"], mine.to_string());
    assert_eq!(listed[0]["multiplayer"], false);
}

#[tokio::test]
async fn test_delete_session_by_owner() {
    let app = common::build_test_app();
    let (session_id, _) = common::session_in_play(&app, "alice", false, &["Mara"]).await;
    let uri = format!("/api/v1/sessions/{session_id}");

    let (forbidden, _) = common::delete(app.router(), &uri, "bob").await;
    let (status, _) = common::delete(app.router(), &uri, "alice").await;

    assert_eq!(forbidden, StatusCode::FORBIDDEN);
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = common::get_json(app.router(), &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = common::get_json(app.router(), &format!("{uri}/campaign")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_idle_policy_update_and_rejection() {
    let app = common::build_test_app();
    let session_id = common::create_session(&app, "alice", false).await;
    let uri = format!("/api/v1/sessions/{session_id}/idle-policy");

    let (status, _) = common::put_json(
        app.router(),
        &uri,
        "alice",
        &serde_json::json!({ "auto_end_enabled": false, "idle_timeout_minutes": 45 }),
    )
    .await;
    let (rejected, json) = common::put_json(
        app.router(),
        &uri,
        "alice",
        &serde_json::json!({ "auto_end_enabled": true, "idle_timeout_minutes": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");
    let (_, view) =
        common::get_json(app.router(), &format!("/api/v1/sessions/{session_id}")).await;
    assert_eq!(view["world_state"]["auto_end_enabled"], false);
    assert_eq!(view["world_state"]["idle_timeout_minutes"], 45);
}

#[tokio::test]
async fn test_commands_on_unknown_session_return_404() {
    let app = common::build_test_app();

    let (status, json) = common::post_empty(
        app.router(),
        &format!("/api/v1/sessions/{}/finish", Uuid::new_v4()),
        "alice",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["retryable"], false);
}
