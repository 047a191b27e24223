//! Presence reported by the chat platform.
//!
//! The platform bot pushes who sits in each guild's voice channel and who
//! holds the narrator role. The registry serves that back to the game as
//! its [`MembershipSource`] and [`NarratorDirectory`].

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;
use werewolf_core::error::GameError;
use werewolf_core::member::{GuildId, Member, MemberId};
use werewolf_core::membership::{MembershipSource, NarratorDirectory};

#[derive(Debug, Default)]
struct GuildPresence {
    members: Vec<Member>,
    narrators: HashSet<MemberId>,
}

/// Latest reported presence per guild.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    guilds: Mutex<HashMap<GuildId, GuildPresence>>,
}

impl PresenceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything known about `guild`.
    pub fn replace(
        &self,
        guild: GuildId,
        members: Vec<Member>,
        narrators: impl IntoIterator<Item = MemberId>,
    ) {
        let presence = GuildPresence {
            members,
            narrators: narrators.into_iter().collect(),
        };
        debug!(guild_id = %guild, present = presence.members.len(), narrators = presence.narrators.len(), "presence replaced");
        self.guilds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(guild, presence);
    }
}

#[async_trait]
impl MembershipSource for PresenceRegistry {
    async fn current(&self, guild: GuildId) -> Result<Vec<Member>, GameError> {
        let guilds = self
            .guilds
            .lock()
            .map_err(|e| GameError::Infrastructure(format!("presence registry poisoned: {e}")))?;
        guilds
            .get(&guild)
            .map(|presence| presence.members.clone())
            .ok_or_else(|| {
                GameError::Infrastructure(format!("no presence reported for guild {guild}"))
            })
    }
}

impl NarratorDirectory for PresenceRegistry {
    fn is_narrator(&self, guild: GuildId, member: &Member) -> bool {
        self.guilds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&guild)
            .is_some_and(|presence| presence.narrators.contains(&member.id))
    }
}
