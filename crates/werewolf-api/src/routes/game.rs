//! Routes for the game session context.
//!
//! Every command goes through `POST /guilds/{guild_id}/game/{action}` with
//! the issuing channel and member in the body, as the platform bot would
//! relay a typed command.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::post};
use serde::Deserialize;
use tracing::{info, instrument};
use werewolf_core::command::CommandContext;
use werewolf_core::error::GameError;
use werewolf_core::member::{ChannelId, GuildId, Member};
use werewolf_game::application::command_handlers::{self, GameCommandResult};
use werewolf_game::application::query_handlers::{self, GameView};
use werewolf_game::domain::commands;
use werewolf_game::domain::roles::Role;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /guilds/{guild_id}/game/{action}.
///
/// Only `channel_id` and `issuer` are always required; the rest depends on
/// the action.
#[derive(Debug, Deserialize)]
pub struct GameActionRequest {
    /// Channel the command was typed in.
    pub channel_id: ChannelId,
    /// Member who typed it.
    pub issuer: Member,
    /// `start`: initial presence; the pushed presence is used if absent.
    #[serde(default)]
    pub snapshot: Option<Vec<Member>>,
    /// `add-role`, `remove-role`, `replace-role`: role name or slug.
    #[serde(default)]
    pub role: Option<String>,
    /// `replace-role`: the role swapped in.
    #[serde(default)]
    pub with_role: Option<String>,
    /// `join-spectator`, `leave-spectator` (defaults to the issuer) and
    /// `set-debug-narrator` (absent clears it).
    #[serde(default)]
    pub member: Option<Member>,
    /// `set-dummy-count`.
    #[serde(default)]
    pub count: Option<i64>,
    /// `revoke-access`.
    #[serde(default)]
    pub members: Option<Vec<Member>>,
}

/// The command named in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameAction {
    Start,
    Cancel,
    Begin,
    Finalize,
    Shuffle,
    AddRole,
    RemoveRole,
    ReplaceRole,
    JoinSpectator,
    LeaveSpectator,
    SetDummyCount,
    SetDebugNarrator,
    End,
    RevokeAccess,
}

impl FromStr for GameAction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "start" => Self::Start,
            "cancel" => Self::Cancel,
            "begin" => Self::Begin,
            "finalize" => Self::Finalize,
            "shuffle" => Self::Shuffle,
            "add-role" => Self::AddRole,
            "remove-role" => Self::RemoveRole,
            "replace-role" => Self::ReplaceRole,
            "join-spectator" => Self::JoinSpectator,
            "leave-spectator" => Self::LeaveSpectator,
            "set-dummy-count" => Self::SetDummyCount,
            "set-debug-narrator" => Self::SetDebugNarrator,
            "end" => Self::End,
            "revoke-access" => Self::RevokeAccess,
            other => {
                return Err(GameError::Validation(format!("unknown game action: {other}")));
            }
        })
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, GameError> {
    value.ok_or_else(|| GameError::Validation(format!("{field} is required")))
}

fn role_field(value: Option<String>, field: &str) -> Result<Role, GameError> {
    required(value, field)?.parse()
}

/// POST /guilds/{guild_id}/game/{action}
#[instrument(skip(state, request), fields(issuer = %request.issuer.id))]
async fn run_action(
    State(state): State<AppState>,
    Path((guild_id, action)): Path<(u64, String)>,
    Json(request): Json<GameActionRequest>,
) -> Result<Json<GameCommandResult>, ApiError> {
    let action: GameAction = action.parse()?;
    Member::ensure_live(
        std::iter::once(&request.issuer)
            .chain(request.snapshot.iter().flatten())
            .chain(&request.member)
            .chain(request.members.iter().flatten()),
    )?;
    let context = CommandContext::new(GuildId(guild_id), request.channel_id, request.issuer);
    let services = &state.services;

    info!(correlation_id = %context.correlation_id, ?action, "handling game command");

    let result = match action {
        GameAction::Start => {
            let command = commands::StartGame {
                context,
                snapshot: request.snapshot,
            };
            command_handlers::handle_start_game(&command, services).await?
        }
        GameAction::Cancel => {
            let command = commands::CancelGame { context };
            command_handlers::handle_cancel_game(&command, services).await?
        }
        GameAction::Begin => {
            let command = commands::BeginRoleAssignment { context };
            command_handlers::handle_begin_role_assignment(&command, services).await?
        }
        GameAction::Finalize => {
            let command = commands::FinalizeRoleAssignment { context };
            command_handlers::handle_finalize_role_assignment(&command, services).await?
        }
        GameAction::Shuffle => {
            let command = commands::ShuffleRoles { context };
            command_handlers::handle_shuffle_roles(&command, services).await?
        }
        GameAction::AddRole => {
            let command = commands::AddRole {
                context,
                role: role_field(request.role, "role")?,
            };
            command_handlers::handle_add_role(&command, services).await?
        }
        GameAction::RemoveRole => {
            let command = commands::RemoveRole {
                context,
                role: role_field(request.role, "role")?,
            };
            command_handlers::handle_remove_role(&command, services).await?
        }
        GameAction::ReplaceRole => {
            let command = commands::ReplaceRole {
                context,
                role: role_field(request.role, "role")?,
                with_role: role_field(request.with_role, "with_role")?,
            };
            command_handlers::handle_replace_role(&command, services).await?
        }
        GameAction::JoinSpectator => {
            let member = request.member.unwrap_or_else(|| context.issuer.clone());
            let command = commands::JoinSpectator { context, member };
            command_handlers::handle_join_spectator(&command, services).await?
        }
        GameAction::LeaveSpectator => {
            let member = request.member.unwrap_or_else(|| context.issuer.clone());
            let command = commands::LeaveSpectator { context, member };
            command_handlers::handle_leave_spectator(&command, services).await?
        }
        GameAction::SetDummyCount => {
            let command = commands::SetDummyCount {
                context,
                count: required(request.count, "count")?,
            };
            command_handlers::handle_set_dummy_count(&command, services).await?
        }
        GameAction::SetDebugNarrator => {
            let command = commands::SetDebugNarrator {
                context,
                member: request.member,
            };
            command_handlers::handle_set_debug_narrator(&command, services).await?
        }
        GameAction::End => {
            let command = commands::EndGame { context };
            command_handlers::handle_end_game(&command, services).await?
        }
        GameAction::RevokeAccess => {
            let command = commands::RevokeChannelAccess {
                context,
                members: required(request.members, "members")?,
            };
            command_handlers::handle_revoke_channel_access(&command, services).await?
        }
    };

    Ok(Json(result))
}

/// GET /guilds/{guild_id}/game
#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    Path(guild_id): Path<u64>,
) -> Result<Json<GameView>, ApiError> {
    let view = query_handlers::get_game(
        GuildId(guild_id),
        &state.services.registry,
        state.services.clock.as_ref(),
    )?;
    Ok(Json(view))
}

/// Returns the router for the game context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/guilds/{guild_id}/game", get(get_game))
        .route("/guilds/{guild_id}/game/{action}", post(run_action))
}
