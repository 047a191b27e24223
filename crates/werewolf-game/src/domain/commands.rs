//! Commands for the game context.

use werewolf_core::command::{Command, CommandContext};
use werewolf_core::member::Member;

use super::roles::Role;

macro_rules! impl_command {
    ($($command:ty => $name:literal),* $(,)?) => {
        $(
            impl Command for $command {
                fn command_type(&self) -> &'static str {
                    $name
                }

                fn context(&self) -> &CommandContext {
                    &self.context
                }
            }
        )*
    };
}

/// Command to open a lobby.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// Command origin.
    pub context: CommandContext,
    /// Initial presence snapshot; pulled from the membership source if
    /// absent.
    pub snapshot: Option<Vec<Member>>,
}

/// Command to call off a game that has not started play.
#[derive(Debug, Clone)]
pub struct CancelGame {
    /// Command origin.
    pub context: CommandContext,
}

/// Command to close the lobby and deal roles.
#[derive(Debug, Clone)]
pub struct BeginRoleAssignment {
    /// Command origin.
    pub context: CommandContext,
}

/// Command to lock in roles and grant channel access.
#[derive(Debug, Clone)]
pub struct FinalizeRoleAssignment {
    /// Command origin.
    pub context: CommandContext,
}

/// Command to reseat the current roles.
#[derive(Debug, Clone)]
pub struct ShuffleRoles {
    /// Command origin.
    pub context: CommandContext,
}

/// Command to convert a villager into a role.
#[derive(Debug, Clone)]
pub struct AddRole {
    /// Command origin.
    pub context: CommandContext,
    /// Role to add.
    pub role: Role,
}

/// Command to convert a role into a villager.
#[derive(Debug, Clone)]
pub struct RemoveRole {
    /// Command origin.
    pub context: CommandContext,
    /// Role to remove.
    pub role: Role,
}

/// Command to swap one role for another.
#[derive(Debug, Clone)]
pub struct ReplaceRole {
    /// Command origin.
    pub context: CommandContext,
    /// Role to take out.
    pub role: Role,
    /// Role to put in.
    pub with_role: Role,
}

/// Command to start spectating.
#[derive(Debug, Clone)]
pub struct JoinSpectator {
    /// Command origin.
    pub context: CommandContext,
    /// Member who will spectate. Must be the issuer unless a narrator issues
    /// it.
    pub member: Member,
}

/// Command to stop spectating.
#[derive(Debug, Clone)]
pub struct LeaveSpectator {
    /// Command origin.
    pub context: CommandContext,
    /// Member returning to the table.
    pub member: Member,
}

/// Command to set the number of synthetic players.
#[derive(Debug, Clone)]
pub struct SetDummyCount {
    /// Command origin.
    pub context: CommandContext,
    /// Requested count; negative values are rejected.
    pub count: i64,
}

/// Command to force a member into the narrator set.
#[derive(Debug, Clone)]
pub struct SetDebugNarrator {
    /// Command origin.
    pub context: CommandContext,
    /// The member, or `None` to clear.
    pub member: Option<Member>,
}

/// Command to close an active game.
#[derive(Debug, Clone)]
pub struct EndGame {
    /// Command origin.
    pub context: CommandContext,
}

/// Command to clear channel grants left over from an earlier game.
#[derive(Debug, Clone)]
pub struct RevokeChannelAccess {
    /// Command origin.
    pub context: CommandContext,
    /// Members whose grants are revoked.
    pub members: Vec<Member>,
}

impl_command! {
    StartGame => "game.start",
    CancelGame => "game.cancel",
    BeginRoleAssignment => "game.begin_role_assignment",
    FinalizeRoleAssignment => "game.finalize_role_assignment",
    ShuffleRoles => "game.shuffle_roles",
    AddRole => "game.add_role",
    RemoveRole => "game.remove_role",
    ReplaceRole => "game.replace_role",
    JoinSpectator => "game.join_spectator",
    LeaveSpectator => "game.leave_spectator",
    SetDummyCount => "game.set_dummy_count",
    SetDebugNarrator => "game.set_debug_narrator",
    EndGame => "game.end",
    RevokeChannelAccess => "game.revoke_channel_access",
}
