//! Domain events for the game context.

use serde::{Deserialize, Serialize};
use werewolf_core::event::{DomainEvent, EventMetadata};
use werewolf_core::member::{GuildId, MemberId};

use super::roles::Role;

/// Emitted when a lobby is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOpened {
    /// Session scope of the game.
    pub guild_id: GuildId,
    /// Members present when the lobby opened.
    pub present: usize,
}

/// Emitted when a member starts or stops spectating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorChanged {
    /// The member concerned.
    pub member_id: MemberId,
}

/// Emitted when the number of synthetic players changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DummyCountSet {
    /// New number of dummies.
    pub count: usize,
}

/// Emitted when the debug narrator is set or cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugNarratorSet {
    /// The forced narrator, if any.
    pub member_id: Option<MemberId>,
}

/// Emitted whenever the role multiset or its seating changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesDealt {
    /// Roles in seating order.
    pub roles: Vec<Role>,
}

/// Emitted when a narrator trades a villager for a role or back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAdjusted {
    /// The role added or removed.
    pub role: Role,
}

/// Emitted when roles are locked in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesFinalized {
    /// Final seat-by-seat assignment.
    pub assignments: Vec<(MemberId, Role)>,
}

/// Event type identifier for [`GameEventKind::GameOpened`].
pub const GAME_OPENED_EVENT_TYPE: &str = "game.opened";
/// Event type identifier for [`GameEventKind::SpectatorJoined`].
pub const SPECTATOR_JOINED_EVENT_TYPE: &str = "game.spectator_joined";
/// Event type identifier for [`GameEventKind::SpectatorLeft`].
pub const SPECTATOR_LEFT_EVENT_TYPE: &str = "game.spectator_left";
/// Event type identifier for [`GameEventKind::DummyCountSet`].
pub const DUMMY_COUNT_SET_EVENT_TYPE: &str = "game.dummy_count_set";
/// Event type identifier for [`GameEventKind::DebugNarratorSet`].
pub const DEBUG_NARRATOR_SET_EVENT_TYPE: &str = "game.debug_narrator_set";
/// Event type identifier for [`GameEventKind::RoleAssignmentBegan`].
pub const ROLE_ASSIGNMENT_BEGAN_EVENT_TYPE: &str = "game.role_assignment_began";
/// Event type identifier for [`GameEventKind::RolesShuffled`].
pub const ROLES_SHUFFLED_EVENT_TYPE: &str = "game.roles_shuffled";
/// Event type identifier for [`GameEventKind::RoleAdded`].
pub const ROLE_ADDED_EVENT_TYPE: &str = "game.role_added";
/// Event type identifier for [`GameEventKind::RoleRemoved`].
pub const ROLE_REMOVED_EVENT_TYPE: &str = "game.role_removed";
/// Event type identifier for [`GameEventKind::RolesFinalized`].
pub const ROLES_FINALIZED_EVENT_TYPE: &str = "game.roles_finalized";
/// Event type identifier for [`GameEventKind::GameCanceled`].
pub const GAME_CANCELED_EVENT_TYPE: &str = "game.canceled";
/// Event type identifier for [`GameEventKind::GameEnded`].
pub const GAME_ENDED_EVENT_TYPE: &str = "game.ended";

/// Event payload variants for the game context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEventKind {
    /// A lobby has been opened.
    GameOpened(GameOpened),
    /// A member became a spectator.
    SpectatorJoined(SpectatorChanged),
    /// A member stopped spectating.
    SpectatorLeft(SpectatorChanged),
    /// The dummy player count changed.
    DummyCountSet(DummyCountSet),
    /// The debug narrator changed.
    DebugNarratorSet(DebugNarratorSet),
    /// The lobby closed and the initial deal was made.
    RoleAssignmentBegan(RolesDealt),
    /// Roles were reseated.
    RolesShuffled(RolesDealt),
    /// A villager was converted into a role.
    RoleAdded(RoleAdjusted),
    /// A role was converted into a villager.
    RoleRemoved(RoleAdjusted),
    /// Roles were locked in.
    RolesFinalized(RolesFinalized),
    /// The game was called off before play.
    GameCanceled,
    /// The game was closed after play.
    GameEnded,
}

/// Domain event envelope for the game context.
#[derive(Debug, Clone)]
pub struct GameEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: GameEventKind,
}

impl GameEventKind {
    /// The event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GameOpened(_) => GAME_OPENED_EVENT_TYPE,
            Self::SpectatorJoined(_) => SPECTATOR_JOINED_EVENT_TYPE,
            Self::SpectatorLeft(_) => SPECTATOR_LEFT_EVENT_TYPE,
            Self::DummyCountSet(_) => DUMMY_COUNT_SET_EVENT_TYPE,
            Self::DebugNarratorSet(_) => DEBUG_NARRATOR_SET_EVENT_TYPE,
            Self::RoleAssignmentBegan(_) => ROLE_ASSIGNMENT_BEGAN_EVENT_TYPE,
            Self::RolesShuffled(_) => ROLES_SHUFFLED_EVENT_TYPE,
            Self::RoleAdded(_) => ROLE_ADDED_EVENT_TYPE,
            Self::RoleRemoved(_) => ROLE_REMOVED_EVENT_TYPE,
            Self::RolesFinalized(_) => ROLES_FINALIZED_EVENT_TYPE,
            Self::GameCanceled => GAME_CANCELED_EVENT_TYPE,
            Self::GameEnded => GAME_ENDED_EVENT_TYPE,
        }
    }
}

impl DomainEvent for GameEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).unwrap_or(serde_json::Value::Null)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
