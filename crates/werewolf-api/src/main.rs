//! Werewolf session engine HTTP host entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use werewolf_api::config::AppConfig;
use werewolf_api::routes;
use werewolf_api::state::AppState;
use werewolf_core::clock::SystemClock;
use werewolf_core::rng::{DeterministicRng, StdRandom};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Read configuration (and .env) before tracing so RUST_LOG from .env
    // applies.
    let config = AppConfig::from_env()?;

    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!(
        guild_id = ?config.guild_id,
        control_channel_id = ?config.control_channel_id,
        seeded = config.rng_seed.is_some(),
        "Starting Werewolf session engine"
    );

    // Build application state.
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = match config.rng_seed {
        Some(seed) => Arc::new(Mutex::new(StdRandom::seeded(seed))),
        None => Arc::new(Mutex::new(StdRandom::from_entropy())),
    };
    let app_state = AppState::new(Arc::new(SystemClock), rng, config.command_policy());

    // Build router.
    // TODO: Replace CorsLayer::permissive() with the bot's origin once it is deployed.
    let app = routes::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
