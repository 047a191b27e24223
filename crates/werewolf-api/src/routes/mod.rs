//! Route modules and the assembled router.

use axum::Router;

use crate::state::AppState;

pub mod access;
pub mod game;
pub mod health;
pub mod presence;

/// Builds the full router: health at the root, guild routes under
/// `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let guilds = Router::new()
        .merge(presence::router())
        .merge(game::router())
        .merge(access::router());

    Router::new()
        .merge(health::router())
        .nest("/api/v1", guilds)
        .with_state(state)
}
