//! Presence push endpoint, called by the platform bot whenever the voice
//! channel or narrator role changes.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use werewolf_core::member::{GuildId, Member, MemberId};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /guilds/{guild_id}/presence.
#[derive(Debug, Deserialize)]
pub struct PresenceRequest {
    /// Everyone currently in the game's voice channel.
    pub members: Vec<Member>,
    /// Members holding the narrator role.
    #[serde(default)]
    pub narrators: Vec<MemberId>,
}

/// Counts echoed back after a presence push.
#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    /// Members recorded as present.
    pub present: usize,
    /// Members recorded as narrators.
    pub narrators: usize,
}

/// POST /guilds/{guild_id}/presence
#[instrument(skip(state, request), fields(members = request.members.len()))]
async fn replace_presence(
    State(state): State<AppState>,
    Path(guild_id): Path<u64>,
    Json(request): Json<PresenceRequest>,
) -> Result<Json<PresenceResponse>, ApiError> {
    Member::ensure_live(&request.members)?;
    let response = PresenceResponse {
        present: request.members.len(),
        narrators: request.narrators.len(),
    };
    info!(guild_id, "presence reported");
    state
        .presence
        .replace(GuildId(guild_id), request.members, request.narrators);
    Ok(Json(response))
}

/// Returns the router for presence pushes.
pub fn router() -> Router<AppState> {
    Router::new().route("/guilds/{guild_id}/presence", post(replace_presence))
}
