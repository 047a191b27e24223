//! Read-back of recorded role channel grants.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use tracing::instrument;
use werewolf_core::member::GuildId;
use werewolf_game::application::ports::GrantRecord;

use crate::state::AppState;

/// GET /guilds/{guild_id}/access
#[instrument(skip(state))]
async fn list_grants(
    State(state): State<AppState>,
    Path(guild_id): Path<u64>,
) -> Json<Vec<GrantRecord>> {
    Json(state.access.grants(GuildId(guild_id)))
}

/// Returns the router for channel grant queries.
pub fn router() -> Router<AppState> {
    Router::new().route("/guilds/{guild_id}/access", get(list_grants))
}
