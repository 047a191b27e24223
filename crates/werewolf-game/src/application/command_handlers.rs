//! Command handlers for the game context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: check where and by whom a command was issued,
//! run the domain operation under the game's mutex, drain the recorded
//! events, then drive the outbound ports with the lock released.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use werewolf_core::aggregate::AggregateRoot;
use werewolf_core::clock::Clock;
use werewolf_core::command::{Command, CommandContext};
use werewolf_core::error::GameError;
use werewolf_core::event::DomainEvent;
use werewolf_core::member::{ChannelId, GuildId, Member, MemberId};
use werewolf_core::membership::{MembershipSource, NarratorDirectory};
use werewolf_core::rng::DeterministicRng;

use crate::application::ports::{ChannelAccessGrantor, StatusSink, StatusUpdate};
use crate::application::query_handlers::GameView;
use crate::application::registry::{GameRegistry, SharedGame};
use crate::application::roster_sync::RosterSync;
use crate::domain::aggregates::{ChannelGrant, Game};
use crate::domain::commands::{
    AddRole, BeginRoleAssignment, CancelGame, EndGame, FinalizeRoleAssignment, JoinSpectator,
    LeaveSpectator, RemoveRole, ReplaceRole, RevokeChannelAccess, SetDebugNarrator,
    SetDummyCount, ShuffleRoles, StartGame,
};
use crate::domain::events::GameEvent;
use crate::domain::roles::{Role, count_of};

/// Where commands are accepted from.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandPolicy {
    /// If set, commands from any other guild are refused.
    pub guild: Option<GuildId>,
    /// If set, narrator commands from any other channel are refused.
    pub control_channel: Option<ChannelId>,
}

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct GameServices {
    /// Running games.
    pub registry: Arc<GameRegistry>,
    /// Event timestamps.
    pub clock: Arc<dyn Clock>,
    /// Role allocation randomness. Locked only inside synchronous domain
    /// calls, never across an await.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Live presence.
    pub membership: Arc<dyn MembershipSource>,
    /// Narrator permissions.
    pub narrators: Arc<dyn NarratorDirectory>,
    /// Status rendering.
    pub status: Arc<dyn StatusSink>,
    /// Role channel permissions.
    pub access: Arc<dyn ChannelAccessGrantor>,
    /// Accepted origins.
    pub policy: CommandPolicy,
}

/// What a command did.
#[derive(Debug, Clone, Serialize)]
pub struct GameCommandResult {
    /// The game acted on, if any.
    pub game_id: Option<Uuid>,
    /// Events recorded, in order.
    pub event_ids: Vec<Uuid>,
    /// State after the command; absent once the game is closed.
    pub view: Option<GameView>,
    /// Members whose channel access could not be changed.
    pub failed_members: Vec<MemberId>,
}

/// Who may issue a command.
#[derive(Debug, Clone, Copy)]
enum Standing<'a> {
    Narrator,
    /// The member themselves, or a narrator acting for them.
    SelfOrNarrator(&'a Member),
}

/// Outcome of a domain operation run under the game lock.
struct Applied<T> {
    value: T,
    game_id: Uuid,
    events: Vec<GameEvent>,
    view: GameView,
}

fn lock_game(shared: &SharedGame) -> Result<MutexGuard<'_, Game>, GameError> {
    shared
        .lock()
        .map_err(|e| GameError::Infrastructure(format!("game mutex poisoned: {e}")))
}

fn lock_rng(
    services: &GameServices,
) -> Result<MutexGuard<'_, dyn DeterministicRng + Send + 'static>, GameError> {
    services
        .rng
        .lock()
        .map_err(|e| GameError::Infrastructure(format!("RNG mutex poisoned: {e}")))
}

fn check_context(
    services: &GameServices,
    context: &CommandContext,
    narrator_command: bool,
) -> Result<(), GameError> {
    if services
        .policy
        .guild
        .is_some_and(|guild| guild != context.guild_id)
    {
        return Err(GameError::Validation(format!(
            "commands are not accepted in guild {}",
            context.guild_id
        )));
    }
    if narrator_command
        && services
            .policy
            .control_channel
            .is_some_and(|channel| channel != context.channel_id)
    {
        return Err(GameError::Validation(format!(
            "narrator commands are not accepted in channel {}",
            context.channel_id
        )));
    }
    Ok(())
}

fn check_standing(
    game: Option<&Game>,
    services: &GameServices,
    context: &CommandContext,
    standing: Standing<'_>,
) -> Result<(), GameError> {
    let guild = context.guild_id;
    let directory = |m: &Member| services.narrators.is_narrator(guild, m);
    let narrates = match game {
        Some(game) => game.is_narrator(&context.issuer, &directory),
        None => directory(&context.issuer),
    };
    match standing {
        _ if narrates => Ok(()),
        Standing::SelfOrNarrator(member) if member.id == context.issuer.id => Ok(()),
        Standing::Narrator => Err(GameError::Validation(format!(
            "{} is not a narrator",
            context.issuer
        ))),
        Standing::SelfOrNarrator(member) => Err(GameError::Validation(format!(
            "{} cannot change spectating for {member}",
            context.issuer
        ))),
    }
}

/// Runs `action` on the guild's game under its mutex and drains the events
/// it recorded.
fn apply<T>(
    services: &GameServices,
    context: &CommandContext,
    standing: Standing<'_>,
    action: impl FnOnce(&mut Game, &dyn Fn(&Member) -> bool) -> Result<T, GameError>,
) -> Result<Applied<T>, GameError> {
    let shared = services.registry.get(context.guild_id)?;
    let mut game = lock_game(&shared)?;
    check_standing(Some(&*game), services, context, standing)?;

    let guild = context.guild_id;
    let narrators = &services.narrators;
    let value = action(&mut *game, &|m: &Member| narrators.is_narrator(guild, m))?;

    let events = game.take_uncommitted_events();
    Ok(Applied {
        value,
        game_id: game.id,
        events,
        view: GameView::of(&game, services.clock.as_ref()),
    })
}

/// [`apply`], closing the game if the operation broke an invariant.
async fn execute<T>(
    services: &GameServices,
    context: &CommandContext,
    standing: Standing<'_>,
    action: impl FnOnce(&mut Game, &dyn Fn(&Member) -> bool) -> Result<T, GameError>,
) -> Result<Applied<T>, GameError> {
    match apply(services, context, standing, action) {
        Err(e) if e.is_fatal() => {
            error!(guild_id = %context.guild_id, error = %e, "closing game after invariant violation");
            close_game(services, context.guild_id, &e.to_string()).await;
            Err(e)
        }
        other => other,
    }
}

/// Runs a command that leaves the game open and publishes the resulting
/// snapshot.
async fn mutate<T>(
    command: &impl Command,
    services: &GameServices,
    standing: Standing<'_>,
    action: impl FnOnce(&mut Game, &dyn Fn(&Member) -> bool) -> Result<T, GameError>,
) -> Result<(T, GameCommandResult), GameError> {
    let context = command.context();
    check_context(services, context, matches!(standing, Standing::Narrator))?;
    let applied = execute(services, context, standing, action).await?;
    let event_ids = log_events(command.command_type(), &applied.events);
    publish(services, StatusUpdate::Snapshot(applied.view.clone())).await;
    Ok((
        applied.value,
        GameCommandResult {
            game_id: Some(applied.game_id),
            event_ids,
            view: Some(applied.view),
            failed_members: Vec::new(),
        },
    ))
}

fn log_events(command_type: &str, events: &[GameEvent]) -> Vec<Uuid> {
    events
        .iter()
        .map(|event| {
            let meta = event.metadata();
            info!(
                command = command_type,
                event_type = event.event_type(),
                game_id = %meta.aggregate_id,
                sequence_number = meta.sequence_number,
                correlation_id = %meta.correlation_id,
                payload = %event.to_payload(),
                "event recorded"
            );
            meta.event_id
        })
        .collect()
}

async fn publish(services: &GameServices, update: StatusUpdate) {
    let guild = update.guild_id();
    if let Err(e) = services.status.publish(update).await {
        warn!(guild_id = %guild, error = %e, "status publish failed");
    }
}

/// Drops the guild's game, stops its sync task, and tells observers.
async fn close_game(services: &GameServices, guild: GuildId, reason: &str) {
    let Some(entry) = services.registry.remove(guild) else {
        return;
    };
    if let Some(sync) = entry.sync {
        sync.stop().await;
    }
    info!(guild_id = %guild, reason, "game closed");
    publish(
        services,
        StatusUpdate::GameClosed {
            guild_id: guild,
            reason: reason.to_owned(),
        },
    )
    .await;
}

fn closed(applied: &Applied<()>, event_ids: Vec<Uuid>) -> GameCommandResult {
    GameCommandResult {
        game_id: Some(applied.game_id),
        event_ids,
        view: None,
        failed_members: Vec::new(),
    }
}

fn removal_refused(role: Role, dealt: usize) -> GameError {
    if dealt == 0 {
        GameError::Validation(format!("{role} is not in the deal"))
    } else {
        GameError::Capacity("cannot remove the last werewolf".to_owned())
    }
}

/// Handles the `StartGame` command: opens a lobby for the guild and starts
/// its roster sync.
///
/// # Errors
///
/// Returns `GameError::Validation` for a refused origin or a non-narrator
/// issuer, `GameError::State` if the guild already has a game, and
/// `GameError::Infrastructure` if no snapshot was given and the membership
/// source fails.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, correlation_id = %command.context.correlation_id))]
pub async fn handle_start_game(
    command: &StartGame,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let context = &command.context;
    let guild = context.guild_id;
    check_context(services, context, true)?;
    check_standing(None, services, context, Standing::Narrator)?;
    if services.registry.contains(guild) {
        return Err(GameError::State(format!(
            "a game is already running in guild {guild}"
        )));
    }

    let snapshot = match &command.snapshot {
        Some(snapshot) => snapshot.clone(),
        None => services.membership.current(guild).await?,
    };

    let narrators = Arc::clone(&services.narrators);
    let mut game = Game::open(
        Uuid::new_v4(),
        guild,
        snapshot,
        &|m: &Member| narrators.is_narrator(guild, m),
        context.correlation_id,
        services.clock.as_ref(),
    );
    let events = game.take_uncommitted_events();
    let game_id = game.id;
    let view = GameView::of(&game, services.clock.as_ref());
    let shared = Arc::new(Mutex::new(game));

    // Another start may have won the race since the check above.
    services.registry.insert(guild, Arc::clone(&shared))?;
    info!(%game_id, players = view.players.len(), narrators = view.narrators.len(), "lobby opened");

    let sync = RosterSync {
        guild_id: guild,
        game: shared,
        membership: Arc::clone(&services.membership),
        narrators,
        status: Arc::clone(&services.status),
        clock: Arc::clone(&services.clock),
    }
    .spawn();
    if let Err(orphan) = services.registry.attach_sync(guild, sync) {
        orphan.stop().await;
    }

    let event_ids = log_events(command.command_type(), &events);
    publish(services, StatusUpdate::Snapshot(view.clone())).await;
    Ok(GameCommandResult {
        game_id: Some(game_id),
        event_ids,
        view: Some(view),
        failed_members: Vec::new(),
    })
}

/// Handles the `CancelGame` command: discards a game that has not started
/// play.
///
/// # Errors
///
/// Returns `GameError::State` if no game is running or it is already
/// active.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, correlation_id = %command.context.correlation_id))]
pub async fn handle_cancel_game(
    command: &CancelGame,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let context = &command.context;
    check_context(services, context, true)?;
    let applied = execute(services, context, Standing::Narrator, |game, _| {
        game.cancel(context.correlation_id, services.clock.as_ref())
    })
    .await?;
    let event_ids = log_events(command.command_type(), &applied.events);
    close_game(services, context.guild_id, "canceled").await;
    Ok(closed(&applied, event_ids))
}

/// Handles the `BeginRoleAssignment` command: closes the lobby, stops the
/// roster sync, and deals roles.
///
/// # Errors
///
/// Returns `GameError::Capacity` if the table is too small or has no
/// narrator and `GameError::State` outside the lobby.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, correlation_id = %command.context.correlation_id))]
pub async fn handle_begin_role_assignment(
    command: &BeginRoleAssignment,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let ((), result) = mutate(command, services, Standing::Narrator, |game, _| {
        let mut rng = lock_rng(services)?;
        game.begin_role_assignment(correlation_id, services.clock.as_ref(), &mut *rng)
    })
    .await?;

    // The loop sees the phase change under the lock and writes nothing more;
    // this just reaps the task.
    if let Some(sync) = services.registry.take_sync(command.context.guild_id) {
        sync.stop().await;
    }
    info!(
        players = result.view.as_ref().map_or(0, |v| v.players.len()),
        "roles dealt"
    );
    Ok(result)
}

/// Handles the `FinalizeRoleAssignment` command: locks in roles, then
/// grants each player access to their role's channel.
///
/// Grants are attempted for every player even if some fail; failures are
/// reported in `failed_members`.
///
/// # Errors
///
/// Returns `GameError::State` outside role assignment.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, correlation_id = %command.context.correlation_id))]
pub async fn handle_finalize_role_assignment(
    command: &FinalizeRoleAssignment,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let (grants, mut result) = mutate(command, services, Standing::Narrator, |game, _| {
        game.finalize_roles(correlation_id, services.clock.as_ref())
    })
    .await?;

    result.failed_members = grant_access(services, command.context.guild_id, &grants).await;
    info!(
        grants = grants.len(),
        failed = result.failed_members.len(),
        "roles finalized"
    );
    Ok(result)
}

async fn grant_access(
    services: &GameServices,
    guild: GuildId,
    grants: &[ChannelGrant],
) -> Vec<MemberId> {
    let mut failed = Vec::new();
    for grant in grants {
        if let Err(e) = services
            .access
            .grant(guild, &grant.member, grant.channel)
            .await
        {
            warn!(member_id = %grant.member.id, channel = %grant.channel, error = %e, "channel grant failed");
            failed.push(grant.member.id);
        }
    }
    failed
}

/// Handles the `ShuffleRoles` command.
///
/// # Errors
///
/// Returns `GameError::State` outside role assignment.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, correlation_id = %command.context.correlation_id))]
pub async fn handle_shuffle_roles(
    command: &ShuffleRoles,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let ((), result) = mutate(command, services, Standing::Narrator, |game, _| {
        let mut rng = lock_rng(services)?;
        game.shuffle_roles(correlation_id, services.clock.as_ref(), &mut *rng)
    })
    .await?;
    Ok(result)
}

/// Handles the `AddRole` command: converts a villager into the role.
///
/// # Errors
///
/// Returns `GameError::Validation` for villager, `GameError::Capacity` if no
/// villager is left to convert, and `GameError::State` outside role
/// assignment.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, role = %command.role))]
pub async fn handle_add_role(
    command: &AddRole,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let role = command.role;
    let ((), result) = mutate(command, services, Standing::Narrator, |game, _| {
        let mut rng = lock_rng(services)?;
        if game.add_role(role, correlation_id, services.clock.as_ref(), &mut *rng)? {
            Ok(())
        } else {
            Err(GameError::Capacity(format!(
                "no villager left to convert into {role}"
            )))
        }
    })
    .await?;
    Ok(result)
}

/// Handles the `RemoveRole` command: converts one holder of the role back
/// into a villager.
///
/// # Errors
///
/// Returns `GameError::Validation` for villager or a role not in the deal,
/// `GameError::Capacity` for the last werewolf, and `GameError::State`
/// outside role assignment.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, role = %command.role))]
pub async fn handle_remove_role(
    command: &RemoveRole,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let role = command.role;
    let ((), result) = mutate(command, services, Standing::Narrator, |game, _| {
        let mut rng = lock_rng(services)?;
        if game.remove_role(role, correlation_id, services.clock.as_ref(), &mut *rng)? {
            Ok(())
        } else {
            Err(removal_refused(role, count_of(game.roles(), role)))
        }
    })
    .await?;
    Ok(result)
}

/// Handles the `ReplaceRole` command: removes one role and adds another in
/// its seat.
///
/// Removing always frees a villager, so the add cannot be refused once the
/// removal succeeded.
///
/// # Errors
///
/// Same as [`handle_remove_role`], plus `GameError::Validation` if either
/// role is villager.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, role = %command.role, with_role = %command.with_role))]
pub async fn handle_replace_role(
    command: &ReplaceRole,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let (role, with_role) = (command.role, command.with_role);
    let ((), result) = mutate(command, services, Standing::Narrator, |game, _| {
        if with_role == Role::Villager {
            return Err(GameError::Validation(
                "villagers fill the remaining seats and cannot be swapped in".to_owned(),
            ));
        }
        let clock = services.clock.as_ref();
        let mut rng = lock_rng(services)?;
        if !game.remove_role(role, correlation_id, clock, &mut *rng)? {
            return Err(removal_refused(role, count_of(game.roles(), role)));
        }
        if game.add_role(with_role, correlation_id, clock, &mut *rng)? {
            Ok(())
        } else {
            Err(GameError::InvariantViolation(format!(
                "no villager left after removing {role}"
            )))
        }
    })
    .await?;
    Ok(result)
}

/// Handles the `JoinSpectator` command.
///
/// # Errors
///
/// Returns `GameError::Validation` if the issuer acts for someone else
/// without narrating, or the member already spectates or narrates, and
/// `GameError::State` during role assignment.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, member_id = %command.member.id))]
pub async fn handle_join_spectator(
    command: &JoinSpectator,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let member = &command.member;
    let ((), result) = mutate(
        command,
        services,
        Standing::SelfOrNarrator(member),
        |game, is_narrator| {
            if game.add_spectator(member, is_narrator, correlation_id, services.clock.as_ref())? {
                Ok(())
            } else {
                Err(GameError::Validation(format!(
                    "{member} is already spectating or narrating"
                )))
            }
        },
    )
    .await?;
    Ok(result)
}

/// Handles the `LeaveSpectator` command.
///
/// # Errors
///
/// Returns `GameError::Validation` if the issuer acts for someone else
/// without narrating, or the member is not spectating, and
/// `GameError::State` during role assignment.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, member_id = %command.member.id))]
pub async fn handle_leave_spectator(
    command: &LeaveSpectator,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let member = &command.member;
    let ((), result) = mutate(
        command,
        services,
        Standing::SelfOrNarrator(member),
        |game, is_narrator| {
            if game.remove_spectator(member, is_narrator, correlation_id, services.clock.as_ref())? {
                Ok(())
            } else {
                Err(GameError::Validation(format!("{member} is not spectating")))
            }
        },
    )
    .await?;
    Ok(result)
}

/// Handles the `SetDummyCount` command.
///
/// # Errors
///
/// Returns `GameError::Capacity` for a negative count and
/// `GameError::State` outside the lobby.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, count = command.count))]
pub async fn handle_set_dummy_count(
    command: &SetDummyCount,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let ((), result) = mutate(command, services, Standing::Narrator, |game, is_narrator| {
        game.set_dummy_count(
            command.count,
            is_narrator,
            correlation_id,
            services.clock.as_ref(),
        )
    })
    .await?;
    Ok(result)
}

/// Handles the `SetDebugNarrator` command.
///
/// # Errors
///
/// Returns `GameError::State` outside the lobby.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id))]
pub async fn handle_set_debug_narrator(
    command: &SetDebugNarrator,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let correlation_id = command.context.correlation_id;
    let ((), result) = mutate(command, services, Standing::Narrator, |game, is_narrator| {
        game.set_debug_narrator(
            command.member.clone(),
            is_narrator,
            correlation_id,
            services.clock.as_ref(),
        )
    })
    .await?;
    Ok(result)
}

/// Handles the `EndGame` command: discards an active game.
///
/// # Errors
///
/// Returns `GameError::State` if no game is running or roles are not yet
/// final.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, correlation_id = %command.context.correlation_id))]
pub async fn handle_end_game(
    command: &EndGame,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let context = &command.context;
    check_context(services, context, true)?;
    let applied = execute(services, context, Standing::Narrator, |game, _| {
        game.end(context.correlation_id, services.clock.as_ref())
    })
    .await?;
    let event_ids = log_events(command.command_type(), &applied.events);
    close_game(services, context.guild_id, "ended").await;
    Ok(closed(&applied, event_ids))
}

/// Handles the `RevokeChannelAccess` command: clears role channel grants,
/// whether or not a game is running.
///
/// Every member is attempted; failures are reported in `failed_members`.
///
/// # Errors
///
/// Returns `GameError::Validation` for a refused origin or a non-narrator
/// issuer.
#[instrument(skip_all, fields(guild_id = %command.context.guild_id, members = command.members.len()))]
pub async fn handle_revoke_channel_access(
    command: &RevokeChannelAccess,
    services: &GameServices,
) -> Result<GameCommandResult, GameError> {
    let context = &command.context;
    let guild = context.guild_id;
    check_context(services, context, true)?;
    let game_id = match services.registry.get(guild).ok() {
        Some(shared) => {
            let game = lock_game(&shared)?;
            check_standing(Some(&*game), services, context, Standing::Narrator)?;
            Some(game.id)
        }
        None => {
            check_standing(None, services, context, Standing::Narrator)?;
            None
        }
    };

    let mut failed_members = Vec::new();
    for member in &command.members {
        if let Err(e) = services.access.revoke(guild, member).await {
            warn!(member_id = %member.id, error = %e, "channel revoke failed");
            failed_members.push(member.id);
        }
    }
    info!(
        revoked = command.members.len() - failed_members.len(),
        failed = failed_members.len(),
        "channel access revoked"
    );
    Ok(GameCommandResult {
        game_id,
        event_ids: Vec::new(),
        view: None,
        failed_members,
    })
}
