//! Session registry: zero or one game per guild.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use werewolf_core::error::GameError;
use werewolf_core::member::GuildId;

use crate::application::roster_sync::RosterSyncHandle;
use crate::domain::aggregates::Game;

/// A game behind the mutex that serializes every roster and allocation
/// change. Never hold the guard across an `.await`.
pub type SharedGame = Arc<Mutex<Game>>;

/// A registered game and its lobby sync task, if still running.
#[derive(Debug)]
pub struct RegisteredGame {
    /// The game.
    pub game: SharedGame,
    /// Running roster sync, present only while in the lobby.
    pub sync: Option<RosterSyncHandle>,
}

/// Owns the games of every guild. Injected into handlers and hosts.
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: Mutex<HashMap<GuildId, RegisteredGame>>,
}

impl GameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn games(&self) -> std::sync::MutexGuard<'_, HashMap<GuildId, RegisteredGame>> {
        // Map operations cannot leave the table half-written.
        self.games.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a game is running in `guild`.
    #[must_use]
    pub fn contains(&self, guild: GuildId) -> bool {
        self.games().contains_key(&guild)
    }

    /// Registers `game` for `guild`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` if the guild already has a game; the
    /// existing game is left untouched.
    pub fn insert(&self, guild: GuildId, game: SharedGame) -> Result<(), GameError> {
        let mut games = self.games();
        if games.contains_key(&guild) {
            return Err(GameError::State(format!(
                "a game is already running in guild {guild}"
            )));
        }
        games.insert(guild, RegisteredGame { game, sync: None });
        Ok(())
    }

    /// Returns the game running in `guild`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` if there is none.
    pub fn get(&self, guild: GuildId) -> Result<SharedGame, GameError> {
        self.games()
            .get(&guild)
            .map(|entry| Arc::clone(&entry.game))
            .ok_or_else(|| GameError::State(format!("no game is running in guild {guild}")))
    }

    /// Attaches a running sync task to the guild's game.
    ///
    /// Returns the handle back if the game is gone, so the caller can stop
    /// it.
    pub fn attach_sync(
        &self,
        guild: GuildId,
        handle: RosterSyncHandle,
    ) -> Result<(), RosterSyncHandle> {
        match self.games().get_mut(&guild) {
            Some(entry) => {
                entry.sync = Some(handle);
                Ok(())
            }
            None => Err(handle),
        }
    }

    /// Detaches the guild's sync task, if any.
    #[must_use]
    pub fn take_sync(&self, guild: GuildId) -> Option<RosterSyncHandle> {
        self.games().get_mut(&guild).and_then(|entry| entry.sync.take())
    }

    /// Removes the guild's game.
    #[must_use]
    pub fn remove(&self, guild: GuildId) -> Option<RegisteredGame> {
        self.games().remove(&guild)
    }

    /// Guilds with a running game.
    #[must_use]
    pub fn guilds(&self) -> Vec<GuildId> {
        self.games().keys().copied().collect()
    }
}
