//! Outbound ports the game drives, with in-memory adapters.
//!
//! Hosts that render status or manage channel permissions implement
//! [`StatusSink`] and [`ChannelAccessGrantor`]. The [`StatusBoard`] and
//! [`AccessLedger`] adapters keep everything in memory; the HTTP host
//! serves them directly and tests use them as recorders.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};
use werewolf_core::error::GameError;
use werewolf_core::member::{GuildId, Member, MemberId};

use crate::application::query_handlers::GameView;
use crate::domain::roles::RoleChannel;

/// Something observers of a guild's game should know about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusUpdate {
    /// Current state of the game.
    Snapshot(GameView),
    /// The membership source has failed repeatedly; the roster may be stale.
    MembershipUnavailable {
        /// Affected guild.
        guild_id: GuildId,
        /// Failures in a row so far.
        consecutive_failures: u32,
        /// Last error seen.
        reason: String,
    },
    /// The game was removed from the registry.
    GameClosed {
        /// Affected guild.
        guild_id: GuildId,
        /// Why it closed.
        reason: String,
    },
}

impl StatusUpdate {
    /// Guild the update concerns.
    #[must_use]
    pub fn guild_id(&self) -> GuildId {
        match self {
            Self::Snapshot(view) => view.guild_id,
            Self::MembershipUnavailable { guild_id, .. } | Self::GameClosed { guild_id, .. } => {
                *guild_id
            }
        }
    }
}

/// Receives status updates for rendering.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Publishes an update.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Infrastructure` if the update cannot be delivered.
    async fn publish(&self, update: StatusUpdate) -> Result<(), GameError>;
}

/// Manages access to the private role channels.
#[async_trait]
pub trait ChannelAccessGrantor: Send + Sync {
    /// Lets `member` into `channel`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Infrastructure` if the platform refuses.
    async fn grant(
        &self,
        guild: GuildId,
        member: &Member,
        channel: RoleChannel,
    ) -> Result<(), GameError>;

    /// Removes every role-channel grant `member` holds.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Infrastructure` if the platform refuses.
    async fn revoke(&self, guild: GuildId, member: &Member) -> Result<(), GameError>;
}

/// In-memory [`StatusSink`] keeping the latest snapshot per guild and every
/// notice.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: Mutex<BoardState>,
}

#[derive(Debug, Default)]
struct BoardState {
    latest: HashMap<GuildId, GameView>,
    snapshot_counts: HashMap<GuildId, u64>,
    notices: Vec<StatusUpdate>,
}

impl StatusBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent snapshot published for `guild`.
    #[must_use]
    pub fn latest(&self, guild: GuildId) -> Option<GameView> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).latest.get(&guild).cloned()
    }

    /// Number of snapshots published for `guild`.
    #[must_use]
    pub fn snapshot_count(&self, guild: GuildId) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot_counts
            .get(&guild)
            .copied()
            .unwrap_or_default()
    }

    /// Every non-snapshot update, oldest first.
    #[must_use]
    pub fn notices(&self) -> Vec<StatusUpdate> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).notices.clone()
    }
}

#[async_trait]
impl StatusSink for StatusBoard {
    async fn publish(&self, update: StatusUpdate) -> Result<(), GameError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|e| GameError::Infrastructure(format!("status board poisoned: {e}")))?;
        match update {
            StatusUpdate::Snapshot(view) => {
                debug!(guild_id = %view.guild_id, phase = ?view.phase, "status snapshot");
                *state.snapshot_counts.entry(view.guild_id).or_default() += 1;
                state.latest.insert(view.guild_id, view);
            }
            StatusUpdate::GameClosed { guild_id, .. } => {
                state.latest.remove(&guild_id);
                state.notices.push(update);
            }
            StatusUpdate::MembershipUnavailable { .. } => {
                state.notices.push(update);
            }
        }
        Ok(())
    }
}

/// A grant currently held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantRecord {
    /// The member let in.
    pub member: Member,
    /// The channel.
    pub channel: RoleChannel,
}

/// In-memory [`ChannelAccessGrantor`] recording who holds which channel.
#[derive(Debug, Default)]
pub struct AccessLedger {
    grants: Mutex<HashMap<GuildId, Vec<GrantRecord>>>,
    grant_calls: Mutex<u64>,
}

impl AccessLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants currently held in `guild`, in grant order.
    #[must_use]
    pub fn grants(&self, guild: GuildId) -> Vec<GrantRecord> {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&guild)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of `grant` calls received.
    #[must_use]
    pub fn grant_calls(&self) -> u64 {
        *self.grant_calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn holds(&self, guild: GuildId, member: MemberId) -> bool {
        self.grants
            .lock()
            .map(|g| {
                g.get(&guild)
                    .is_some_and(|records| records.iter().any(|r| r.member.id == member))
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl ChannelAccessGrantor for AccessLedger {
    async fn grant(
        &self,
        guild: GuildId,
        member: &Member,
        channel: RoleChannel,
    ) -> Result<(), GameError> {
        info!(guild_id = %guild, member_id = %member.id, channel = %channel, "granting channel access");
        let mut grants = self
            .grants
            .lock()
            .map_err(|e| GameError::Infrastructure(format!("access ledger poisoned: {e}")))?;
        grants.entry(guild).or_default().push(GrantRecord {
            member: member.clone(),
            channel,
        });
        drop(grants);
        let mut calls = self
            .grant_calls
            .lock()
            .map_err(|e| GameError::Infrastructure(format!("access ledger poisoned: {e}")))?;
        *calls += 1;
        Ok(())
    }

    async fn revoke(&self, guild: GuildId, member: &Member) -> Result<(), GameError> {
        if !self.holds(guild, member.id) {
            warn!(guild_id = %guild, member_id = %member.id, "revoke requested for member without grants");
        }
        let mut grants = self
            .grants
            .lock()
            .map_err(|e| GameError::Infrastructure(format!("access ledger poisoned: {e}")))?;
        if let Some(records) = grants.get_mut(&guild) {
            records.retain(|r| r.member.id != member.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::roles::Role;

    fn channel(role: Role) -> RoleChannel {
        role.channel().unwrap()
    }

    #[tokio::test]
    async fn test_access_ledger_records_and_revokes_grants() {
        // Arrange
        let ledger = AccessLedger::new();
        let guild = GuildId(1);
        let ada = Member::new(10, "Ada");
        let bob = Member::new(11, "Bob");

        // Act
        ledger.grant(guild, &ada, channel(Role::Werewolf)).await.unwrap();
        ledger.grant(guild, &bob, channel(Role::Cupid)).await.unwrap();
        ledger.revoke(guild, &ada).await.unwrap();

        // Assert
        let grants = ledger.grants(guild);
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].member, bob);
        assert_eq!(grants[0].channel.role(), Role::Cupid);
        assert_eq!(ledger.grant_calls(), 2);
    }

    #[tokio::test]
    async fn test_revoke_without_grants_is_harmless() {
        let ledger = AccessLedger::new();

        let result = ledger.revoke(GuildId(1), &Member::new(10, "Ada")).await;

        assert!(result.is_ok());
        assert!(ledger.grants(GuildId(1)).is_empty());
    }

    #[tokio::test]
    async fn test_status_board_keeps_notices_in_order() {
        let board = StatusBoard::new();

        board
            .publish(StatusUpdate::MembershipUnavailable {
                guild_id: GuildId(1),
                consecutive_failures: 3,
                reason: "timeout".to_owned(),
            })
            .await
            .unwrap();
        board
            .publish(StatusUpdate::GameClosed {
                guild_id: GuildId(1),
                reason: "canceled".to_owned(),
            })
            .await
            .unwrap();

        let notices = board.notices();
        assert_eq!(notices.len(), 2);
        assert!(matches!(notices[0], StatusUpdate::MembershipUnavailable { .. }));
        assert!(matches!(notices[1], StatusUpdate::GameClosed { .. }));
        assert_eq!(board.snapshot_count(GuildId(1)), 0);
    }
}
