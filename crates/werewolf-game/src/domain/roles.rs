//! The closed set of hidden roles and the table-size constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use werewolf_core::error::GameError;

/// Fewest players a game can start with.
pub const MIN_PLAYERS: usize = 5;

/// One werewolf per this many players (rounded down, never below one).
pub const WOLF_RATIO: usize = 3;

/// A hidden role dealt to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Villager,
    Werewolf,
    Cupid,
    Angel,
    Sheriff,
    FortuneTeller,
    Fisherman,
    Undertaker,
    FlowerChild,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 9] = [
        Role::Villager,
        Role::Werewolf,
        Role::Cupid,
        Role::Angel,
        Role::Sheriff,
        Role::FortuneTeller,
        Role::Fisherman,
        Role::Undertaker,
        Role::FlowerChild,
    ];

    /// Name shown to players.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Role::Villager => "Villager",
            Role::Werewolf => "Werewolf",
            Role::Cupid => "Cupid",
            Role::Angel => "Angel",
            Role::Sheriff => "Sheriff",
            Role::FortuneTeller => "Fortune Teller",
            Role::Fisherman => "Fisherman",
            Role::Undertaker => "Undertaker",
            Role::FlowerChild => "Flower Child",
        }
    }

    /// Kebab-case identifier used on the wire.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Role::Villager => "villager",
            Role::Werewolf => "werewolf",
            Role::Cupid => "cupid",
            Role::Angel => "angel",
            Role::Sheriff => "sheriff",
            Role::FortuneTeller => "fortune-teller",
            Role::Fisherman => "fisherman",
            Role::Undertaker => "undertaker",
            Role::FlowerChild => "flower-child",
        }
    }

    /// Roles drawn at random during initial allocation. Werewolves are
    /// seeded separately and villagers only pad.
    pub fn special() -> impl Iterator<Item = Role> {
        Self::ALL
            .into_iter()
            .filter(|role| !matches!(role, Role::Villager | Role::Werewolf))
    }

    /// The private night channel holders of this role are let into, if any.
    ///
    /// Villagers have no night action and the sheriff acts in the open.
    #[must_use]
    pub const fn channel(self) -> Option<RoleChannel> {
        match self {
            Role::Villager | Role::Sheriff => None,
            other => Some(RoleChannel(other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Role {
    type Err = GameError;

    /// Accepts the display name or the slug, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| {
                role.display_name().eq_ignore_ascii_case(needle)
                    || role.slug().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| GameError::Validation(format!("unknown role: {needle}")))
    }
}

/// Key of a role's dedicated channel, handed to the channel-access
/// collaborator when roles are finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleChannel(Role);

impl RoleChannel {
    /// The role this channel belongs to.
    #[must_use]
    pub const fn role(self) -> Role {
        self.0
    }

    /// Channel key, identical to the role slug.
    #[must_use]
    pub const fn key(self) -> &'static str {
        self.0.slug()
    }
}

impl fmt::Display for RoleChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Number of `role` entries in `roles`.
#[must_use]
pub fn count_of(roles: &[Role], role: Role) -> usize {
    roles.iter().filter(|r| **r == role).count()
}
