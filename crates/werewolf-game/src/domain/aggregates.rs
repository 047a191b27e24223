//! Aggregate root for the game context.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use werewolf_core::aggregate::AggregateRoot;
use werewolf_core::clock::Clock;
use werewolf_core::error::GameError;
use werewolf_core::event::EventMetadata;
use werewolf_core::member::{GuildId, Member, MemberId};
use werewolf_core::rng::DeterministicRng;

use super::allocator;
use super::events::{
    DebugNarratorSet, DummyCountSet, GameEvent, GameEventKind, GameOpened, RoleAdjusted,
    RolesDealt, RolesFinalized, SpectatorChanged,
};
use super::roles::{MIN_PLAYERS, Role, RoleChannel, count_of};
use super::roster::{Roster, RosterInputs, classify};

/// Lifecycle state of a game.
///
/// Canceled and ended games are dropped from the registry rather than kept
/// in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Gathering players; the roster follows the voice channel.
    Lobby,
    /// Roster frozen; narrators tune the role deal.
    RoleAssignment,
    /// Roles are locked in and play is under way.
    Active,
}

impl GamePhase {
    fn name(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::RoleAssignment => "role assignment",
            Self::Active => "active",
        }
    }
}

/// A seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Member (or dummy) id.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Dealt role, unset until allocation runs.
    pub role: Option<Role>,
    /// Whether the player has been eliminated. Set by gameplay, not here.
    pub dead: bool,
}

impl Player {
    fn seat(member: &Member, role: Option<Role>) -> Self {
        Self {
            id: member.id,
            name: member.display_name.clone(),
            role,
            dead: false,
        }
    }
}

/// A channel grant owed to a player once roles are final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGrant {
    /// The player to let in.
    pub member: Member,
    /// The channel of their role.
    pub channel: RoleChannel,
}

/// The aggregate root for one game session.
#[derive(Debug)]
pub struct Game {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Session scope.
    pub(crate) guild_id: GuildId,
    /// Current version (drained event count).
    pub(crate) version: i64,
    /// Current lifecycle phase.
    pub(crate) phase: GamePhase,
    /// Last presence snapshot. Frozen once the lobby closes.
    raw_members: Vec<Member>,
    /// Members who asked to sit out.
    spectator_ids: HashSet<MemberId>,
    /// Synthetic players.
    dummies: Vec<Member>,
    /// Member forced into the narrator set.
    debug_narrator: Option<Member>,
    /// Derived partition of everyone above.
    pub(crate) roster: Roster,
    /// Seats, in roster order.
    pub(crate) players: Vec<Player>,
    /// Role multiset, positionally aligned with `players` while assigning.
    pub(crate) roles: Vec<Role>,
    /// Locked-in assignment, kept even for players who later spectate.
    finalized: HashMap<MemberId, Role>,
    /// Uncommitted events pending drain.
    uncommitted_events: Vec<GameEvent>,
}

impl Game {
    /// Opens a lobby from an initial presence snapshot.
    #[must_use]
    pub fn open(
        id: Uuid,
        guild_id: GuildId,
        snapshot: Vec<Member>,
        is_narrator: &dyn Fn(&Member) -> bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let mut game = Self {
            id,
            guild_id,
            version: 0,
            phase: GamePhase::Lobby,
            raw_members: snapshot,
            spectator_ids: HashSet::new(),
            dummies: Vec::new(),
            debug_narrator: None,
            roster: Roster::default(),
            players: Vec::new(),
            roles: Vec::new(),
            finalized: HashMap::new(),
            uncommitted_events: Vec::new(),
        };
        game.reclassify(is_narrator);
        let present = game.raw_members.len();
        game.record(
            GameEventKind::GameOpened(GameOpened { guild_id, present }),
            correlation_id,
            clock,
        );
        game
    }

    /// Session scope of this game.
    #[must_use]
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Current partition of participants.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Current seats.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Current role multiset.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Number of synthetic players.
    #[must_use]
    pub fn dummy_count(&self) -> usize {
        self.dummies.len()
    }

    /// The forced narrator, if any.
    #[must_use]
    pub fn debug_narrator(&self) -> Option<&Member> {
        self.debug_narrator.as_ref()
    }

    /// Whether `member` narrates this game, either by permission or as the
    /// debug narrator.
    #[must_use]
    pub fn is_narrator(&self, member: &Member, is_narrator: &dyn Fn(&Member) -> bool) -> bool {
        self.debug_narrator.as_ref().is_some_and(|d| d.id == member.id) || is_narrator(member)
    }

    /// Whether the lobby may close: enough players and at least one
    /// narrator.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Capacity` naming the shortfall.
    pub fn check_start_capacity(&self) -> Result<(), GameError> {
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::Capacity(format!(
                "need at least {MIN_PLAYERS} players, have {}",
                self.players.len()
            )));
        }
        if self.roster.narrators.is_empty() {
            return Err(GameError::Capacity(
                "need at least one narrator".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: GameEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = GameEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }

    fn require_phase(&self, expected: GamePhase, action: &str) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::State(format!(
                "cannot {action} while the game is in {}",
                self.phase.name()
            )))
        }
    }

    /// Re-derives the roster from current inputs and reseats players.
    ///
    /// In the lobby seats carry no role. Once active, seats take their role
    /// from the locked-in assignment.
    fn reclassify(&mut self, is_narrator: &dyn Fn(&Member) -> bool) {
        self.roster = classify(
            RosterInputs {
                raw_members: &self.raw_members,
                spectators: &self.spectator_ids,
                dummies: &self.dummies,
                debug_narrator: self.debug_narrator.as_ref(),
            },
            is_narrator,
        );
        let finalized = &self.finalized;
        self.players = self
            .roster
            .players
            .iter()
            .map(|m| Player::seat(m, finalized.get(&m.id).copied()))
            .collect();
    }

    /// Replaces the presence snapshot and reclassifies. Returns whether the
    /// roster changed.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` outside the lobby.
    pub fn sync_roster(
        &mut self,
        snapshot: Vec<Member>,
        is_narrator: &dyn Fn(&Member) -> bool,
    ) -> Result<bool, GameError> {
        self.require_phase(GamePhase::Lobby, "sync the roster")?;
        let before = self.roster.clone();
        self.raw_members = snapshot;
        self.reclassify(is_narrator);
        Ok(self.roster != before)
    }

    fn require_roster_mutable(&self, action: &str) -> Result<(), GameError> {
        if self.phase == GamePhase::RoleAssignment {
            return Err(GameError::State(format!(
                "cannot {action} while roles are being assigned"
            )));
        }
        Ok(())
    }

    /// Marks `member` as a spectator.
    ///
    /// Returns `Ok(false)` without change if they already spectate or
    /// narrate.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` during role assignment.
    pub fn add_spectator(
        &mut self,
        member: &Member,
        is_narrator: &dyn Fn(&Member) -> bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<bool, GameError> {
        self.require_roster_mutable("change spectators")?;
        if self.spectator_ids.contains(&member.id) || self.is_narrator(member, is_narrator) {
            return Ok(false);
        }
        self.spectator_ids.insert(member.id);
        self.reclassify(is_narrator);
        self.record(
            GameEventKind::SpectatorJoined(SpectatorChanged {
                member_id: member.id,
            }),
            correlation_id,
            clock,
        );
        Ok(true)
    }

    /// Returns a spectator to the table.
    ///
    /// Returns `Ok(false)` without change unless they currently spectate and
    /// do not narrate.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` during role assignment, and once play has
    /// started for a member who was never dealt a role.
    pub fn remove_spectator(
        &mut self,
        member: &Member,
        is_narrator: &dyn Fn(&Member) -> bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<bool, GameError> {
        self.require_roster_mutable("change spectators")?;
        if !self.spectator_ids.contains(&member.id) || self.is_narrator(member, is_narrator) {
            return Ok(false);
        }
        if self.phase == GamePhase::Active && !self.finalized.contains_key(&member.id) {
            return Err(GameError::State(format!(
                "{member} was not dealt a role and cannot join a game in play"
            )));
        }
        self.spectator_ids.remove(&member.id);
        self.reclassify(is_narrator);
        self.record(
            GameEventKind::SpectatorLeft(SpectatorChanged {
                member_id: member.id,
            }),
            correlation_id,
            clock,
        );
        Ok(true)
    }

    /// Replaces the synthetic players with `count` fresh ones.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Capacity` for a negative or oversized count and
    /// `GameError::State` outside the lobby.
    pub fn set_dummy_count(
        &mut self,
        count: i64,
        is_narrator: &dyn Fn(&Member) -> bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), GameError> {
        if count < 0 {
            return Err(GameError::Capacity(format!(
                "dummy count must not be negative, got {count}"
            )));
        }
        let count = u32::try_from(count)
            .map_err(|_| GameError::Capacity(format!("dummy count {count} is too large")))?;
        self.require_phase(GamePhase::Lobby, "change dummy players")?;
        self.dummies = (1..=count).map(Member::dummy).collect();
        self.reclassify(is_narrator);
        self.record(
            GameEventKind::DummyCountSet(DummyCountSet {
                count: self.dummies.len(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Forces `member` into the narrator set, or clears the override.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` outside the lobby.
    pub fn set_debug_narrator(
        &mut self,
        member: Option<Member>,
        is_narrator: &dyn Fn(&Member) -> bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Lobby, "change the debug narrator")?;
        let member_id = member.as_ref().map(|m| m.id);
        self.debug_narrator = member;
        self.reclassify(is_narrator);
        self.record(
            GameEventKind::DebugNarratorSet(DebugNarratorSet { member_id }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Closes the lobby and makes the initial deal.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` outside the lobby, `GameError::Capacity`
    /// if the table is too small or unnarrated, and
    /// `GameError::InvariantViolation` if the deal comes out inconsistent.
    pub fn begin_role_assignment(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Lobby, "begin role assignment")?;
        self.check_start_capacity()?;

        self.roles = allocator::setup_roles(self.players.len(), rng);
        self.phase = GamePhase::RoleAssignment;
        self.deal(rng);
        self.check_invariants()?;

        self.record(
            GameEventKind::RoleAssignmentBegan(RolesDealt {
                roles: self.roles.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Permutes the roles and reseats them.
    fn deal(&mut self, rng: &mut dyn DeterministicRng) {
        allocator::shuffle_roles(&mut self.roles, rng);
        for (player, role) in self.players.iter_mut().zip(&self.roles) {
            player.role = Some(*role);
        }
    }

    /// Reseats the current roles at random.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` outside role assignment and
    /// `GameError::InvariantViolation` if seats and roles disagree.
    pub fn shuffle_roles(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::RoleAssignment, "shuffle roles")?;
        self.deal(rng);
        self.check_invariants()?;
        self.record(
            GameEventKind::RolesShuffled(RolesDealt {
                roles: self.roles.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Converts a villager into `role` and reseats.
    ///
    /// Returns `Ok(false)` without change if no villager is left.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` for `Role::Villager`,
    /// `GameError::State` outside role assignment.
    pub fn add_role(
        &mut self,
        role: Role,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<bool, GameError> {
        self.require_phase(GamePhase::RoleAssignment, "add roles")?;
        if role == Role::Villager {
            return Err(GameError::Validation(
                "villagers fill the remaining seats and cannot be added".to_owned(),
            ));
        }
        if !allocator::add_role(&mut self.roles, role) {
            return Ok(false);
        }
        self.deal(rng);
        self.check_invariants()?;
        self.record(
            GameEventKind::RoleAdded(RoleAdjusted { role }),
            correlation_id,
            clock,
        );
        Ok(true)
    }

    /// Converts one `role` into a villager and reseats.
    ///
    /// Returns `Ok(false)` without change if `role` is not dealt or it is
    /// the last werewolf.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` for `Role::Villager`,
    /// `GameError::State` outside role assignment.
    pub fn remove_role(
        &mut self,
        role: Role,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<bool, GameError> {
        self.require_phase(GamePhase::RoleAssignment, "remove roles")?;
        if role == Role::Villager {
            return Err(GameError::Validation(
                "villagers fill the remaining seats and cannot be removed".to_owned(),
            ));
        }
        if !allocator::remove_role(&mut self.roles, role) {
            return Ok(false);
        }
        self.deal(rng);
        self.check_invariants()?;
        self.record(
            GameEventKind::RoleRemoved(RoleAdjusted { role }),
            correlation_id,
            clock,
        );
        Ok(true)
    }

    /// Locks in the current seating and returns the channel grants owed.
    ///
    /// Dummies hold roles but get no grants.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` outside role assignment and
    /// `GameError::InvariantViolation` if any seat lacks a role.
    pub fn finalize_roles(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Vec<ChannelGrant>, GameError> {
        self.require_phase(GamePhase::RoleAssignment, "finalize roles")?;
        self.check_invariants()?;

        let mut assignments = Vec::with_capacity(self.players.len());
        let mut grants = Vec::new();
        for (member, player) in self.roster.players.iter().zip(&self.players) {
            let Some(role) = player.role else {
                return Err(GameError::InvariantViolation(format!(
                    "player {} has no role after allocation",
                    player.name
                )));
            };
            assignments.push((player.id, role));
            if let (Some(channel), false) = (role.channel(), member.id.is_dummy()) {
                grants.push(ChannelGrant {
                    member: member.clone(),
                    channel,
                });
            }
        }

        self.finalized = assignments.iter().copied().collect();
        self.phase = GamePhase::Active;
        self.record(
            GameEventKind::RolesFinalized(RolesFinalized { assignments }),
            correlation_id,
            clock,
        );
        Ok(grants)
    }

    /// Calls the game off before play.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` once the game is active.
    pub fn cancel(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), GameError> {
        if self.phase == GamePhase::Active {
            return Err(GameError::State(
                "an active game must be ended, not canceled".to_owned(),
            ));
        }
        self.record(GameEventKind::GameCanceled, correlation_id, clock);
        Ok(())
    }

    /// Closes an active game.
    ///
    /// # Errors
    ///
    /// Returns `GameError::State` before roles are finalized.
    pub fn end(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), GameError> {
        self.require_phase(GamePhase::Active, "end the game")?;
        self.record(GameEventKind::GameEnded, correlation_id, clock);
        Ok(())
    }

    /// Verifies the allocation invariants.
    ///
    /// Before the first deal there is nothing to check beyond the roster
    /// partition.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvariantViolation` describing the first breach.
    pub fn check_invariants(&self) -> Result<(), GameError> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.roster.all().find(|m| !seen.insert(m.id)) {
            return Err(GameError::InvariantViolation(format!(
                "{dup} appears in more than one roster set"
            )));
        }
        if self.phase == GamePhase::Active {
            return match self.players.iter().find(|p| p.role.is_none()) {
                Some(unseated) => Err(GameError::InvariantViolation(format!(
                    "player {} is seated without a role",
                    unseated.name
                ))),
                None => Ok(()),
            };
        }
        if self.phase != GamePhase::RoleAssignment {
            return Ok(());
        }
        if self.roles.len() != self.players.len() {
            return Err(GameError::InvariantViolation(format!(
                "{} roles dealt to {} players",
                self.roles.len(),
                self.players.len()
            )));
        }
        if count_of(&self.roles, Role::Werewolf) == 0 {
            return Err(GameError::InvariantViolation(
                "no werewolf in the deal".to_owned(),
            ));
        }
        if let Some(unseated) = self.players.iter().find(|p| p.role.is_none()) {
            return Err(GameError::InvariantViolation(format!(
                "player {} has no role after allocation",
                unseated.name
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for Game {
    type Event = GameEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        let events = std::mem::take(&mut self.uncommitted_events);
        self.version += events.len() as i64;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use werewolf_core::event::DomainEvent;
    use werewolf_core::rng::StdRandom;
    use werewolf_test_support::{FixedClock, MockRng};

    const NARRATOR: u64 = 100;

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn narrator_predicate(member: &Member) -> bool {
        member.id == MemberId(NARRATOR)
    }

    fn present(count: u64) -> Vec<Member> {
        std::iter::once(Member::new(NARRATOR, "narrator"))
            .chain((1..=count).map(|i| Member::new(1000 + i, format!("player-{i}"))))
            .collect()
    }

    fn lobby(player_count: u64) -> Game {
        Game::open(
            Uuid::new_v4(),
            GuildId(1),
            present(player_count),
            &narrator_predicate,
            Uuid::new_v4(),
            &fixed_clock(),
        )
    }

    fn assigning(player_count: u64) -> Game {
        let mut game = lobby(player_count);
        game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();
        game
    }

    fn player_ids(game: &Game) -> Vec<u64> {
        game.players().iter().map(|p| p.id.0).collect()
    }

    fn assert_seated_consistently(game: &Game) {
        let mut seated: Vec<Role> = game.players().iter().map(|p| p.role.unwrap()).collect();
        let mut dealt = game.roles().to_vec();
        seated.sort();
        dealt.sort();
        assert_eq!(seated, dealt);
    }

    #[test]
    fn test_open_classifies_snapshot_and_records_event() {
        // Arrange / Act
        let game = lobby(5);

        // Assert
        assert_eq!(game.phase(), GamePhase::Lobby);
        assert_eq!(game.roster().narrators.len(), 1);
        assert_eq!(game.players().len(), 5);
        assert!(game.players().iter().all(|p| p.role.is_none() && !p.dead));

        let events = game.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "game.opened");
        assert_eq!(events[0].metadata().sequence_number, 1);
    }

    #[test]
    fn test_take_uncommitted_events_advances_version() {
        let mut game = lobby(5);

        let drained = game.take_uncommitted_events();

        assert_eq!(drained.len(), 1);
        assert!(game.uncommitted_events().is_empty());
        assert_eq!(game.version(), 1);
    }

    #[test]
    fn test_begin_blocked_below_min_players() {
        let mut game = lobby(4);

        let result = game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut MockRng);

        match result {
            Err(GameError::Capacity(msg)) => assert_eq!(msg, "need at least 5 players, have 4"),
            other => panic!("expected Capacity, got {other:?}"),
        }
        assert_eq!(game.phase(), GamePhase::Lobby);
        assert!(game.roles().is_empty());
    }

    #[test]
    fn test_begin_blocked_without_narrator() {
        let snapshot: Vec<Member> = (1..=6).map(|i| Member::new(1000 + i, "p")).collect();
        let mut game = Game::open(
            Uuid::new_v4(),
            GuildId(1),
            snapshot,
            &|_| false,
            Uuid::new_v4(),
            &fixed_clock(),
        );

        let result = game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut MockRng);

        assert!(matches!(result, Err(GameError::Capacity(_))));
    }

    #[test]
    fn test_dummies_fill_a_short_table() {
        // Arrange
        let mut game = lobby(2);
        assert!(game.check_start_capacity().is_err());

        // Act
        game.set_dummy_count(3, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        // Assert
        assert_eq!(game.players().len(), 5);
        assert!(game.check_start_capacity().is_ok());
        assert!(
            game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut MockRng)
                .is_ok()
        );
    }

    #[test]
    fn test_dummies_do_not_displace_members_with_small_ids() {
        // Arrange
        let snapshot = vec![
            Member::new(NARRATOR, "narrator"),
            Member::new(1, "Ada"),
            Member::new(2, "Bob"),
        ];
        let mut game = Game::open(
            Uuid::new_v4(),
            GuildId(1),
            snapshot,
            &narrator_predicate,
            Uuid::new_v4(),
            &fixed_clock(),
        );

        // Act
        game.set_dummy_count(3, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        // Assert
        assert_eq!(game.players().len(), 5);
        assert_eq!(&player_ids(&game)[..2], &[1, 2]);
        assert!(game.players()[2..].iter().all(|p| p.id.is_dummy()));
        assert!(game.check_start_capacity().is_ok());
    }

    #[test]
    fn test_negative_dummy_count_is_rejected() {
        let mut game = lobby(2);

        let result = game.set_dummy_count(-1, &narrator_predicate, Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(GameError::Capacity(_))));
        assert_eq!(game.dummy_count(), 0);
    }

    #[test]
    fn test_debug_narrator_enables_start_without_permissions() {
        let snapshot: Vec<Member> = (1..=5).map(|i| Member::new(1000 + i, "p")).collect();
        let mut game = Game::open(
            Uuid::new_v4(),
            GuildId(1),
            snapshot,
            &|_| false,
            Uuid::new_v4(),
            &fixed_clock(),
        );
        let debugger = Member::new(77, "debugger");

        game.set_debug_narrator(Some(debugger.clone()), &|_| false, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        assert_eq!(game.roster().narrators, vec![debugger.clone()]);
        assert!(game.is_narrator(&debugger, &|_| false));
        assert!(game.check_start_capacity().is_ok());
    }

    #[test]
    fn test_spectator_round_trip_restores_players() {
        // Arrange
        let mut game = lobby(6);
        let before = player_ids(&game);
        let member = game.roster().players[2].clone();

        // Act
        let joined = game
            .add_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();
        let during = player_ids(&game);
        let left = game
            .remove_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        // Assert
        assert!(joined);
        assert!(left);
        assert!(!during.contains(&member.id.0));
        assert_eq!(game.roster().spectators.len(), 0);
        assert_eq!(player_ids(&game), before);
    }

    #[test]
    fn test_add_spectator_rejects_narrators_and_existing_spectators() {
        let mut game = lobby(6);
        let narrator = Member::new(NARRATOR, "narrator");
        let member = game.roster().players[0].clone();

        let narrator_result = game
            .add_spectator(&narrator, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();
        game.add_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();
        let again = game
            .add_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        assert!(!narrator_result);
        assert!(!again);
        assert_eq!(game.roster().spectators, vec![member]);
    }

    #[test]
    fn test_remove_spectator_rejects_non_spectators() {
        let mut game = lobby(6);
        let member = game.roster().players[0].clone();

        let result = game
            .remove_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        assert!(!result);
        assert_eq!(game.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_sync_roster_picks_up_new_members() {
        let mut game = lobby(4);
        let mut snapshot = present(4);
        snapshot.push(Member::new(5000, "latecomer"));

        let changed = game.sync_roster(snapshot.clone(), &narrator_predicate).unwrap();
        let unchanged = game.sync_roster(snapshot, &narrator_predicate).unwrap();

        assert!(changed);
        assert!(!unchanged);
        assert_eq!(game.players().len(), 5);
    }

    #[test]
    fn test_begin_deals_one_role_per_player() {
        // Arrange
        let mut game = lobby(5);

        // Act
        game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut StdRandom::seeded(5))
            .unwrap();

        // Assert
        assert_eq!(game.phase(), GamePhase::RoleAssignment);
        assert_eq!(game.roles().len(), 5);
        assert_eq!(count_of(game.roles(), Role::Werewolf), 1);
        assert_seated_consistently(&game);
    }

    #[test]
    fn test_roster_frozen_during_role_assignment() {
        let mut game = assigning(6);
        let member = game.roster().players[0].clone();

        let spectate = game.add_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock());
        let sync = game.sync_roster(present(8), &narrator_predicate);
        let dummies = game.set_dummy_count(2, &narrator_predicate, Uuid::new_v4(), &fixed_clock());

        assert!(matches!(spectate, Err(GameError::State(_))));
        assert!(matches!(sync, Err(GameError::State(_))));
        assert!(matches!(dummies, Err(GameError::State(_))));
        assert_eq!(game.players().len(), 6);
    }

    #[test]
    fn test_role_adjustments_rejected_outside_role_assignment() {
        let mut game = lobby(6);

        let add = game.add_role(Role::Cupid, Uuid::new_v4(), &fixed_clock(), &mut MockRng);
        let shuffle = game.shuffle_roles(Uuid::new_v4(), &fixed_clock(), &mut MockRng);
        let finalize = game.finalize_roles(Uuid::new_v4(), &fixed_clock());

        assert!(matches!(add, Err(GameError::State(_))));
        assert!(matches!(shuffle, Err(GameError::State(_))));
        assert!(matches!(finalize, Err(GameError::State(_))));
    }

    #[test]
    fn test_villager_cannot_be_added_or_removed_directly() {
        let mut game = assigning(9);

        let add = game.add_role(Role::Villager, Uuid::new_v4(), &fixed_clock(), &mut MockRng);
        let remove = game.remove_role(Role::Villager, Uuid::new_v4(), &fixed_clock(), &mut MockRng);

        assert!(matches!(add, Err(GameError::Validation(_))));
        assert!(matches!(remove, Err(GameError::Validation(_))));
    }

    #[test]
    fn test_remove_then_add_fortune_teller_restores_counts() {
        // Arrange: nine players deal three wolves and six specials, one of
        // them a fortune teller.
        let mut game = lobby(9);
        game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();
        assert_eq!(count_of(game.roles(), Role::FortuneTeller), 1);
        let original: Vec<usize> = Role::ALL.iter().map(|r| count_of(game.roles(), *r)).collect();

        // Act
        let removed = game
            .remove_role(Role::FortuneTeller, Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();
        let after_remove = count_of(game.roles(), Role::FortuneTeller);
        let added = game
            .add_role(Role::FortuneTeller, Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();

        // Assert
        assert!(removed);
        assert_eq!(after_remove, 0);
        assert!(added);
        let restored: Vec<usize> = Role::ALL.iter().map(|r| count_of(game.roles(), *r)).collect();
        assert_eq!(restored, original);
        assert_seated_consistently(&game);
    }

    #[test]
    fn test_last_werewolf_cannot_be_removed() {
        let mut game = assigning(5);
        let before = game.roles().to_vec();

        let removed = game
            .remove_role(Role::Werewolf, Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();

        assert!(!removed);
        assert_eq!(game.roles(), before.as_slice());
    }

    #[test]
    fn test_add_role_without_villagers_leaves_deal_unchanged() {
        // Five players: one wolf and four specials, no villagers.
        let mut game = assigning(5);
        let before = game.roles().to_vec();

        let added = game
            .add_role(Role::Werewolf, Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();

        assert!(!added);
        assert_eq!(game.roles(), before.as_slice());
    }

    #[test]
    fn test_finalize_locks_roles_and_returns_grants() {
        // Arrange
        let mut game = lobby(3);
        game.set_dummy_count(2, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();
        game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();

        // Act
        let grants = game.finalize_roles(Uuid::new_v4(), &fixed_clock()).unwrap();

        // Assert
        assert_eq!(game.phase(), GamePhase::Active);
        let expected: Vec<MemberId> = game
            .players()
            .iter()
            .filter(|p| !p.id.is_dummy() && p.role.and_then(Role::channel).is_some())
            .map(|p| p.id)
            .collect();
        let granted: Vec<MemberId> = grants.iter().map(|g| g.member.id).collect();
        assert_eq!(granted, expected);
        for grant in &grants {
            let player = game.players().iter().find(|p| p.id == grant.member.id).unwrap();
            assert_eq!(Some(grant.channel.role()), player.role);
        }
        assert!(matches!(
            game.add_role(Role::Cupid, Uuid::new_v4(), &fixed_clock(), &mut MockRng),
            Err(GameError::State(_))
        ));
    }

    #[test]
    fn test_spectating_after_finalize_keeps_role_as_dead_weight() {
        // Arrange
        let mut game = assigning(6);
        game.finalize_roles(Uuid::new_v4(), &fixed_clock()).unwrap();
        let seat = game.players()[0].clone();
        let member = Member::new(seat.id.0, seat.name.clone());
        let roles_before = game.roles().to_vec();

        // Act
        let joined = game
            .add_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();
        let while_spectating = game.players().len();
        game.remove_spectator(&member, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();

        // Assert
        assert!(joined);
        assert_eq!(while_spectating, 5);
        assert_eq!(game.roles(), roles_before.as_slice());
        let back = game.players().iter().find(|p| p.id == seat.id).unwrap();
        assert_eq!(back.role, seat.role);
    }

    #[test]
    fn test_lobby_spectator_cannot_take_a_seat_once_in_play() {
        // Arrange
        let mut game = lobby(6);
        let watcher = Member::new(1001, "player-1");
        game.add_spectator(&watcher, &narrator_predicate, Uuid::new_v4(), &fixed_clock())
            .unwrap();
        game.begin_role_assignment(Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();
        game.finalize_roles(Uuid::new_v4(), &fixed_clock()).unwrap();

        // Act
        let result =
            game.remove_spectator(&watcher, &narrator_predicate, Uuid::new_v4(), &fixed_clock());

        // Assert
        assert!(matches!(result, Err(GameError::State(_))));
        assert_eq!(game.players().len(), 5);
        assert_eq!(game.roles().len(), 5);
        assert!(game.players().iter().all(|p| p.role.is_some()));
        assert_eq!(game.roster().spectators, vec![watcher]);
        assert!(game.check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_detects_roleless_seat_in_play() {
        let mut game = assigning(5);
        game.finalize_roles(Uuid::new_v4(), &fixed_clock()).unwrap();
        game.players[4].role = None;

        match game.check_invariants() {
            Err(GameError::InvariantViolation(msg)) => {
                assert!(msg.contains("without a role"), "{msg}");
            }
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_and_end_respect_phase() {
        let mut lobby_game = lobby(5);
        let mut active_game = assigning(5);
        active_game.finalize_roles(Uuid::new_v4(), &fixed_clock()).unwrap();

        assert!(lobby_game.cancel(Uuid::new_v4(), &fixed_clock()).is_ok());
        assert!(matches!(
            lobby_game.end(Uuid::new_v4(), &fixed_clock()),
            Err(GameError::State(_))
        ));
        assert!(matches!(
            active_game.cancel(Uuid::new_v4(), &fixed_clock()),
            Err(GameError::State(_))
        ));
        assert!(active_game.end(Uuid::new_v4(), &fixed_clock()).is_ok());
    }

    #[test]
    fn test_check_invariants_detects_unseated_player() {
        let mut game = assigning(5);
        game.players[0].role = None;

        match game.check_invariants() {
            Err(GameError::InvariantViolation(msg)) => {
                assert!(msg.contains("has no role"), "{msg}");
            }
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_check_invariants_detects_count_mismatch() {
        let mut game = assigning(5);
        game.roles.push(Role::Villager);

        assert!(matches!(
            game.check_invariants(),
            Err(GameError::InvariantViolation(_))
        ));
    }
}
