//! In-memory membership collaborators.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use werewolf_core::error::GameError;
use werewolf_core::member::{GuildId, Member, MemberId};
use werewolf_core::membership::{MembershipSource, NarratorDirectory};

/// A membership source returning whatever roster it was last given, for
/// every guild.
#[derive(Debug)]
pub struct StaticMembershipSource {
    members: Mutex<Vec<Member>>,
    calls: AtomicUsize,
    failures_left: AtomicU32,
}

impl StaticMembershipSource {
    /// Creates a source that reports `members` as present.
    #[must_use]
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members: Mutex::new(members),
            calls: AtomicUsize::new(0),
            failures_left: AtomicU32::new(0),
        }
    }

    /// Replaces the reported roster.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set(&self, members: Vec<Member>) {
        *self.members.lock().unwrap() = members;
    }

    /// Makes the next `count` calls fail before the roster is served again.
    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Number of `current` calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipSource for StaticMembershipSource {
    async fn current(&self, guild: GuildId) -> Result<Vec<Member>, GameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(GameError::Infrastructure(format!(
                "voice channel of guild {guild} unreachable"
            )));
        }
        Ok(self.members.lock().unwrap().clone())
    }
}

/// A membership source whose platform is always down.
#[derive(Debug, Default)]
pub struct FailingMembershipSource {
    calls: AtomicUsize,
}

impl FailingMembershipSource {
    /// Creates the source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `current` calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipSource for FailingMembershipSource {
    async fn current(&self, guild: GuildId) -> Result<Vec<Member>, GameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GameError::Infrastructure(format!(
            "voice channel of guild {guild} unreachable"
        )))
    }
}

/// Grants the narrator role to a fixed set of members in every guild.
#[derive(Debug, Default)]
pub struct StaticNarratorDirectory {
    narrators: HashSet<MemberId>,
}

impl StaticNarratorDirectory {
    /// Creates a directory where exactly `narrators` narrate.
    pub fn new(narrators: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            narrators: narrators.into_iter().collect(),
        }
    }
}

impl NarratorDirectory for StaticNarratorDirectory {
    fn is_narrator(&self, _guild: GuildId, member: &Member) -> bool {
        self.narrators.contains(&member.id)
    }
}
