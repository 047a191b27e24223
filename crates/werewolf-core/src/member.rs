//! Platform identities as seen by the game core.
//!
//! The host platform's member objects never cross into the core. The
//! integration layer converts them into [`Member`] values, which carry only
//! what classification needs: a stable id and a display name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Identifier of a platform member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

/// Ids above this value belong to synthetic players and are never handed
/// out to platform members.
pub const DUMMY_ID_FLOOR: u64 = u64::MAX - 0xFFFF_FFFF;

impl MemberId {
    /// Whether the id lies in the range reserved for synthetic players.
    #[must_use]
    pub const fn is_dummy(self) -> bool {
        self.0 > DUMMY_ID_FLOOR
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the session scope (a guild / server on the host platform).
/// At most one game exists per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a text channel a command was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A platform member, reduced to identity and display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Stable platform identifier.
    pub id: MemberId,
    /// Name shown in status output.
    pub display_name: String,
}

impl Member {
    /// Creates a member value.
    #[must_use]
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id: MemberId(id),
            display_name: display_name.into(),
        }
    }

    /// Creates the `index`-th synthetic test player (1-based).
    ///
    /// Dummy ids count down from `u64::MAX`, inside the range above
    /// [`DUMMY_ID_FLOOR`].
    #[must_use]
    pub fn dummy(index: u32) -> Self {
        let id = u64::MAX - u64::from(index.saturating_sub(1));
        Self::new(id, format!("Dummy {index}"))
    }

    /// Rejects members whose id lies in the synthetic range.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` naming the first offending member.
    pub fn ensure_live<'a>(
        members: impl IntoIterator<Item = &'a Member>,
    ) -> Result<(), GameError> {
        match members.into_iter().find(|m| m.id.is_dummy()) {
            Some(m) => Err(GameError::Validation(format!(
                "member id {} is reserved for dummy players",
                m.id
            ))),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}
