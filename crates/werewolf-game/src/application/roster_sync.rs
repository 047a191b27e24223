//! Lobby roster sync: keeps the lobby's roster in step with the voice
//! channel until the lobby closes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use werewolf_core::clock::Clock;
use werewolf_core::error::GameError;
use werewolf_core::member::{GuildId, Member};
use werewolf_core::membership::{MembershipSource, NarratorDirectory};

use crate::application::ports::{StatusSink, StatusUpdate};
use crate::application::query_handlers::GameView;
use crate::application::registry::SharedGame;
use crate::domain::aggregates::GamePhase;

/// Time between two roster pulls.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Consecutive membership failures after which observers are told the
/// roster may be stale.
pub const MEMBERSHIP_FAILURE_THRESHOLD: u32 = 3;

/// Everything one guild's sync task needs.
pub struct RosterSync {
    /// Guild being synced.
    pub guild_id: GuildId,
    /// The lobby.
    pub game: SharedGame,
    /// Where presence comes from.
    pub membership: Arc<dyn MembershipSource>,
    /// Who narrates.
    pub narrators: Arc<dyn NarratorDirectory>,
    /// Where snapshots go.
    pub status: Arc<dyn StatusSink>,
    /// Timestamps for snapshots.
    pub clock: Arc<dyn Clock>,
}

/// Running sync task and its stop signal.
#[derive(Debug)]
pub struct RosterSyncHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RosterSyncHandle {
    /// Signals the task to stop and waits for it to finish.
    ///
    /// The task checks the signal before every write, so once this returns
    /// no further classification happens.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "roster sync task did not shut down cleanly");
        }
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// What a single tick did.
enum Tick {
    Published(GameView),
    LobbyClosed,
}

impl RosterSync {
    /// Starts syncing on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> RosterSyncHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(token.clone()));
        RosterSyncHandle { token, task }
    }

    async fn run(self, token: CancellationToken) {
        info!(guild_id = %self.guild_id, "roster sync started");
        let mut failures: u32 = 0;

        loop {
            if token.is_cancelled() {
                break;
            }

            let fetched = tokio::select! {
                () = token.cancelled() => break,
                result = self.membership.current(self.guild_id) => result,
            };

            match fetched {
                Ok(snapshot) => {
                    if failures >= MEMBERSHIP_FAILURE_THRESHOLD {
                        info!(guild_id = %self.guild_id, failures, "membership source recovered");
                    }
                    failures = 0;
                    match self.apply(snapshot, &token) {
                        Ok(Tick::Published(view)) => self.publish(StatusUpdate::Snapshot(view)).await,
                        Ok(Tick::LobbyClosed) => break,
                        Err(e) => {
                            error!(guild_id = %self.guild_id, error = %e, "roster sync aborted");
                            break;
                        }
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!(guild_id = %self.guild_id, failures, error = %e, "membership fetch failed, skipping tick");
                    if failures == MEMBERSHIP_FAILURE_THRESHOLD {
                        self.publish(StatusUpdate::MembershipUnavailable {
                            guild_id: self.guild_id,
                            consecutive_failures: failures,
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }

            tokio::select! {
                () = token.cancelled() => break,
                () = tokio::time::sleep(SYNC_INTERVAL) => {}
            }
        }

        info!(guild_id = %self.guild_id, "roster sync stopped");
    }

    /// Writes one snapshot into the lobby, unless the lobby has closed or
    /// the task was told to stop while fetching.
    fn apply(&self, snapshot: Vec<Member>, token: &CancellationToken) -> Result<Tick, GameError> {
        let mut game = self
            .game
            .lock()
            .map_err(|e| GameError::Infrastructure(format!("game mutex poisoned: {e}")))?;
        if token.is_cancelled() || game.phase() != GamePhase::Lobby {
            return Ok(Tick::LobbyClosed);
        }
        let guild = self.guild_id;
        let narrators = Arc::clone(&self.narrators);
        let changed = game.sync_roster(snapshot, &|m: &Member| narrators.is_narrator(guild, m))?;
        if changed {
            debug!(guild_id = %guild, players = game.players().len(), "lobby roster changed");
        }
        Ok(Tick::Published(GameView::of(&game, self.clock.as_ref())))
    }

    async fn publish(&self, update: StatusUpdate) {
        if let Err(e) = self.status.publish(update).await {
            warn!(guild_id = %self.guild_id, error = %e, "status publish failed");
        }
    }
}
