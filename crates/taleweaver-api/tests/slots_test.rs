//! Integration tests for multiplayer slots and turn order.

mod common;

use axum::http::StatusCode;

fn action(text: &str) -> serde_json::Value {
    serde_json::json!({ "text": text })
}

#[tokio::test]
async fn test_multiplayer_turns_follow_claimed_slots() {
    let app = common::build_test_app();
    let (session_id, characters) =
        common::session_in_play(&app, "alice", true, &["Mara", "Ilsa"]).await;
    let base = format!("/api/v1/sessions/{session_id}");
    let slot = |i: usize, verb: &str| format!("{base}/slots/{}/{verb}", characters[i]);

    // Each player claims one slot; the second claim on a held slot fails.
    let (status, _) = common::post_json(
        app.router(),
        &slot(0, "claim"),
        "bob",
        &serde_json::json!({ "player_name": "Bob" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = common::post_empty(app.router(), &slot(0, "claim"), "carol").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "already_claimed");
    let (status, _) = common::post_empty(app.router(), &slot(1, "claim"), "carol").await;
    assert_eq!(status, StatusCode::OK);

    // Carol cannot act out of turn.
    let (status, json) = common::post_json(
        app.router(),
        &format!("{base}/input"),
        "carol",
        &action("I search the canal"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "not_your_turn");

    // Bob acts; the turn passes straight to Carol.
    let (status, json) = common::post_json(
        app.router(),
        &format!("{base}/input"),
        "bob",
        &action("I climb the bell tower"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let (_, view) = common::get_json(app.router(), &base).await;
    assert_eq!(view["turn"]["state"], "active");
    assert_eq!(view["turn"]["character_id"], characters[1].to_string());

    let (status, _) = common::post_json(
        app.router(),
        &format!("{base}/input"),
        "carol",
        &action("I search the canal"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_release_and_kick_free_slots() {
    let app = common::build_test_app();
    let (session_id, characters) =
        common::session_in_play(&app, "alice", true, &["Mara", "Ilsa"]).await;
    let base = format!("/api/v1/sessions/{session_id}");
    let slot = |i: usize, verb: &str| format!("{base}/slots/{}/{verb}", characters[i]);
    common::post_empty(app.router(), &slot(0, "claim"), "bob").await;
    common::post_empty(app.router(), &slot(1, "claim"), "carol").await;

    // Only the holder may release, only the host may kick.
    let (status, _) = common::post_empty(app.router(), &slot(0, "release"), "carol").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = common::post_empty(app.router(), &slot(1, "kick"), "bob").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (released, _) = common::post_empty(app.router(), &slot(0, "release"), "bob").await;
    let (kicked, _) = common::post_empty(app.router(), &slot(1, "kick"), "alice").await;

    assert_eq!(released, StatusCode::OK);
    assert_eq!(kicked, StatusCode::OK);
    let (_, view) = common::get_json(app.router(), &base).await;
    for character in view["world_state"]["characters"].as_array().unwrap() {
        assert!(character["player_id"].is_null());
    }

    // A freed slot can be claimed again.
    let (status, _) = common::post_empty(app.router(), &slot(0, "claim"), "carol").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_claimed_player_sees_session_in_listing() {
    let app = common::build_test_app();
    let (session_id, characters) =
        common::session_in_play(&app, "alice", true, &["Mara"]).await;
    common::post_empty(
        app.router(),
        &format!("/api/v1/sessions/{session_id}/slots/{}/claim", characters[0]),
        "bob",
    )
    .await;

    let (status, json) = common::get_json_as(app.router(), "/api/v1/sessions", "bob").await;

    assert_eq!(status, StatusCode::OK);
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["session_id"], session_id.to_string());
    assert_eq!(listed[0]["multiplayer"], true);
}

#[tokio::test]
async fn test_claiming_in_hot_seat_returns_400() {
    let app = common::build_test_app();
    let (session_id, characters) =
        common::session_in_play(&app, "alice", false, &["Mara"]).await;

    let (status, json) = common::post_empty(
        app.router(),
        &format!("/api/v1/sessions/{session_id}/slots/{}/claim", characters[0]),
        "alice",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_input");
}
