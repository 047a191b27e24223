//! Shared application state.

use std::sync::{Arc, Mutex};

use werewolf_core::clock::Clock;
use werewolf_core::rng::DeterministicRng;
use werewolf_game::application::command_handlers::{CommandPolicy, GameServices};
use werewolf_game::application::ports::{AccessLedger, StatusBoard};
use werewolf_game::application::registry::GameRegistry;

use crate::presence::PresenceRegistry;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Collaborators the game handlers run against.
    pub services: GameServices,
    /// Pushed presence; the services' membership source and narrator
    /// directory.
    pub presence: Arc<PresenceRegistry>,
    /// Published status; the services' status sink.
    pub status: Arc<StatusBoard>,
    /// Recorded channel grants; the services' access grantor.
    pub access: Arc<AccessLedger>,
}

impl AppState {
    /// Create new application state with in-memory adapters.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        policy: CommandPolicy,
    ) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let status = Arc::new(StatusBoard::new());
        let access = Arc::new(AccessLedger::new());
        let services = GameServices {
            registry: Arc::new(GameRegistry::new()),
            clock,
            rng,
            membership: presence.clone(),
            narrators: presence.clone(),
            status: status.clone(),
            access: access.clone(),
            policy,
        };
        Self {
            services,
            presence,
            status,
            access,
        }
    }
}
