//! Membership collaborators provided by the host platform.

use async_trait::async_trait;

use crate::error::GameError;
use crate::member::{GuildId, Member};

/// Source of the live presence roster (who currently sits in the game's
/// voice channel).
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Returns a snapshot of the members currently present in `guild`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Infrastructure` if the platform cannot be reached.
    async fn current(&self, guild: GuildId) -> Result<Vec<Member>, GameError>;
}

/// Permission lookup deciding who may run the game.
pub trait NarratorDirectory: Send + Sync {
    /// Whether `member` holds the narrator role in `guild`.
    fn is_narrator(&self, guild: GuildId, member: &Member) -> bool;
}
