//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use werewolf_core::rng::DeterministicRng;
use werewolf_game::application::command_handlers::CommandPolicy;
use werewolf_test_support::{FixedClock, MockRng};

use werewolf_api::routes;
use werewolf_api::state::AppState;

/// Guild every test plays in.
pub const GUILD: u64 = 1;
/// The configured control channel.
pub const CONTROL_CHANNEL: u64 = 10;
/// Member id holding the narrator role.
pub const NARRATOR_ID: u64 = 100;

/// Build state with a fixed clock, `MockRng`, and commands restricted to
/// `GUILD` and `CONTROL_CHANNEL`.
pub fn test_state() -> AppState {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    AppState::new(
        Arc::new(FixedClock::default()),
        rng,
        CommandPolicy {
            guild: Some(werewolf_core::member::GuildId(GUILD)),
            control_channel: Some(werewolf_core::member::ChannelId(CONTROL_CHANNEL)),
        },
    )
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(state: &AppState) -> Router {
    routes::build_router(state.clone())
}

/// The narrator as JSON.
pub fn narrator() -> Value {
    json!({ "id": NARRATOR_ID, "display_name": "narrator" })
}

/// Player `i` as JSON.
pub fn player(i: u64) -> Value {
    json!({ "id": 1000 + i, "display_name": format!("player-{i}") })
}

/// The narrator plus `players` players.
pub fn table(players: u64) -> Value {
    let mut members = vec![narrator()];
    members.extend((1..=players).map(player));
    Value::Array(members)
}

/// Body for a narrator command from the control channel.
pub fn narrator_command(extra: Value) -> Value {
    let mut body = json!({ "channel_id": CONTROL_CHANNEL, "issuer": narrator() });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    body
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Run a narrator command against `/api/v1/guilds/{GUILD}/game/{action}`.
pub async fn game_action(state: &AppState, action: &str, extra: Value) -> (StatusCode, Value) {
    post_json(
        build_test_app(state),
        &format!("/api/v1/guilds/{GUILD}/game/{action}"),
        &narrator_command(extra),
    )
    .await
}

/// Push presence for `GUILD` with the narrator holding the role.
pub async fn push_presence(state: &AppState, members: Value) {
    let (status, _) = post_json(
        build_test_app(state),
        &format!("/api/v1/guilds/{GUILD}/presence"),
        &json!({ "members": members, "narrators": [NARRATOR_ID] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
