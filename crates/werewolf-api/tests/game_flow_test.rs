//! Integration tests for the game session lifecycle over HTTP.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{GUILD, build_test_app, game_action, get_json, player, post_json, push_presence};

#[tokio::test]
async fn test_full_lifecycle_from_lobby_to_end() {
    let state = common::test_state();
    push_presence(&state, common::table(5)).await;

    // Lobby.
    let (status, json) = game_action(&state, "start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"]["phase"], "lobby");
    assert_eq!(json["view"]["can_begin"], true);

    // Role assignment.
    let (status, json) = game_action(&state, "begin", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"]["phase"], "role_assignment");
    assert_eq!(json["view"]["roles"].as_array().unwrap().len(), 5);

    let (status, _) = game_action(&state, "shuffle", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // Active.
    let (status, json) = game_action(&state, "finalize", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"]["phase"], "active");
    assert!(json["failed_members"].as_array().unwrap().is_empty());

    let (status, grants) =
        get_json(build_test_app(&state), &format!("/api/v1/guilds/{GUILD}/access")).await;
    assert_eq!(status, StatusCode::OK);
    // Five players draw one werewolf and four specials, none of them sheriff.
    assert_eq!(grants.as_array().unwrap().len(), 5);

    // Spectating is still allowed once play is under way.
    let (status, json) = post_json(
        build_test_app(&state),
        &format!("/api/v1/guilds/{GUILD}/game/join-spectator"),
        &json!({ "channel_id": 99, "issuer": player(1) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"]["players"].as_array().unwrap().len(), 4);

    // Ended.
    let (status, json) = game_action(&state, "end", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["view"].is_null());

    let (status, json) =
        get_json(build_test_app(&state), &format!("/api/v1/guilds/{GUILD}/game")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "state_error");
}

#[tokio::test]
async fn test_role_adjustments_over_http() {
    let state = common::test_state();
    push_presence(&state, common::table(9)).await;
    game_action(&state, "start", json!({})).await;
    game_action(&state, "begin", json!({})).await;

    let (removed, json) =
        game_action(&state, "remove-role", json!({ "role": "Fortune Teller" })).await;
    assert_eq!(removed, StatusCode::OK);
    let roles = json["view"]["roles"].as_array().unwrap();
    assert!(!roles.iter().any(|r| r == "fortune-teller"));
    assert!(roles.iter().any(|r| r == "villager"));

    let (added, json) = game_action(&state, "add-role", json!({ "role": "fortune-teller" })).await;
    assert_eq!(added, StatusCode::OK);
    let roles = json["view"]["roles"].as_array().unwrap();
    assert!(roles.iter().any(|r| r == "fortune-teller"));
    assert!(!roles.iter().any(|r| r == "villager"));

    let (status, json) = game_action(&state, "add-role", json!({ "role": "cupid" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "capacity_error");
}

#[tokio::test]
async fn test_dummies_fill_a_short_table_over_http() {
    let state = common::test_state();
    push_presence(&state, common::table(2)).await;
    game_action(&state, "start", json!({})).await;

    let (status, json) = game_action(&state, "set-dummy-count", json!({ "count": 3 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"]["dummy_count"], 3);
    assert_eq!(json["view"]["can_begin"], true);

    let (status, _) = game_action(&state, "set-dummy-count", json!({ "count": -1 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_dummies_sit_beside_members_with_small_ids() {
    let state = common::test_state();
    let members = json!([
        common::narrator(),
        { "id": 1, "display_name": "Ada" },
        { "id": 2, "display_name": "Bob" },
    ]);
    push_presence(&state, members).await;
    game_action(&state, "start", json!({})).await;

    let (status, json) = game_action(&state, "set-dummy-count", json!({ "count": 3 })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"]["players"].as_array().unwrap().len(), 5);
    assert_eq!(json["view"]["players"][0]["id"], 1);
    assert_eq!(json["view"]["players"][1]["id"], 2);
    assert_eq!(json["view"]["can_begin"], true);
}

#[tokio::test]
async fn test_presence_with_reserved_dummy_id_is_rejected() {
    let state = common::test_state();
    let members = json!([
        common::narrator(),
        { "id": u64::MAX, "display_name": "Mallory" },
    ]);

    let (status, json) = post_json(
        build_test_app(&state),
        &format!("/api/v1/guilds/{GUILD}/presence"),
        &json!({ "members": members, "narrators": [common::NARRATOR_ID] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_cancel_leaves_no_game() {
    let state = common::test_state();
    push_presence(&state, common::table(5)).await;
    game_action(&state, "start", json!({})).await;

    let (status, _) = game_action(&state, "cancel", json!({})).await;
    let (after, _) =
        get_json(build_test_app(&state), &format!("/api/v1/guilds/{GUILD}/game")).await;
    let (again, _) = game_action(&state, "start", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(after, StatusCode::CONFLICT);
    assert_eq!(again, StatusCode::OK);
}

#[tokio::test]
async fn test_narrator_commands_outside_control_channel_are_400() {
    let state = common::test_state();
    push_presence(&state, common::table(5)).await;

    let (status, json) = post_json(
        build_test_app(&state),
        &format!("/api/v1/guilds/{GUILD}/game/start"),
        &json!({ "channel_id": 11, "issuer": common::narrator() }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_revoke_access_without_game() {
    let state = common::test_state();

    let (status, json) = game_action(
        &state,
        "revoke-access",
        json!({ "members": [player(1), player(2)] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["game_id"].is_null());
    assert!(json["failed_members"].as_array().unwrap().is_empty());
}
