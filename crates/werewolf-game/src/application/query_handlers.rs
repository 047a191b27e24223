//! Query handlers for the game context.
//!
//! This module builds read-only views of a guild's game for status
//! rendering and host APIs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use werewolf_core::aggregate::AggregateRoot;
use werewolf_core::clock::Clock;
use werewolf_core::error::GameError;
use werewolf_core::member::{GuildId, Member};

use crate::application::registry::GameRegistry;
use crate::domain::aggregates::{Game, GamePhase, Player};
use crate::domain::roles::Role;

/// Read-only view of a game.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    /// The game identifier.
    pub game_id: Uuid,
    /// The session scope.
    pub guild_id: GuildId,
    /// Current lifecycle phase.
    pub phase: GamePhase,
    /// Members running the game.
    pub narrators: Vec<Member>,
    /// Seats, with roles once dealt.
    pub players: Vec<Player>,
    /// Present members sitting out.
    pub spectators: Vec<Member>,
    /// Role multiset in seating order; empty in the lobby.
    pub roles: Vec<Role>,
    /// Number of synthetic players.
    pub dummy_count: usize,
    /// The forced narrator, if any.
    pub debug_narrator: Option<Member>,
    /// Whether the lobby could close right now.
    pub can_begin: bool,
    /// Current version (event count).
    pub version: i64,
    /// When this view was taken.
    pub observed_at: DateTime<Utc>,
}

impl GameView {
    /// Captures the current state of `game`.
    #[must_use]
    pub fn of(game: &Game, clock: &dyn Clock) -> Self {
        Self {
            game_id: game.id,
            guild_id: game.guild_id(),
            phase: game.phase(),
            narrators: game.roster().narrators.clone(),
            players: game.players().to_vec(),
            spectators: game.roster().spectators.clone(),
            roles: game.roles().to_vec(),
            dummy_count: game.dummy_count(),
            debug_narrator: game.debug_narrator().cloned(),
            can_begin: game.phase() == GamePhase::Lobby && game.check_start_capacity().is_ok(),
            version: game.version() + i64::try_from(game.uncommitted_events().len()).unwrap_or(0),
            observed_at: clock.now(),
        }
    }
}

/// Retrieves the game running in `guild`.
///
/// # Errors
///
/// Returns `GameError::State` if no game is running there and
/// `GameError::Infrastructure` if the game's lock is poisoned.
pub fn get_game(
    guild: GuildId,
    registry: &GameRegistry,
    clock: &dyn Clock,
) -> Result<GameView, GameError> {
    let handle = registry.get(guild)?;
    let game = handle
        .lock()
        .map_err(|e| GameError::Infrastructure(format!("game mutex poisoned: {e}")))?;
    Ok(GameView::of(&game, clock))
}
