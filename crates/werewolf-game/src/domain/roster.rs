//! Roster classification: who narrates, who plays, who watches.

use std::collections::HashSet;

use serde::Serialize;
use werewolf_core::member::{Member, MemberId};

/// Disjoint partition of everyone taking part in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Roster {
    /// Members running the game.
    pub narrators: Vec<Member>,
    /// Members (and dummies) who will be dealt roles, in seating order.
    pub players: Vec<Member>,
    /// Present members sitting the game out.
    pub spectators: Vec<Member>,
}

impl Roster {
    /// Every member across the three sets.
    pub fn all(&self) -> impl Iterator<Item = &Member> {
        self.narrators
            .iter()
            .chain(&self.players)
            .chain(&self.spectators)
    }

    /// Whether `id` is in the player set.
    #[must_use]
    pub fn is_player(&self, id: MemberId) -> bool {
        self.players.iter().any(|m| m.id == id)
    }
}

/// Inputs to a classification pass.
///
/// Classification is a pure function of these sets; it never looks at a
/// previous [`Roster`].
#[derive(Debug, Clone, Copy)]
pub struct RosterInputs<'a> {
    /// Live presence snapshot.
    pub raw_members: &'a [Member],
    /// Members who asked to sit out.
    pub spectators: &'a HashSet<MemberId>,
    /// Synthetic players for testing with a short table.
    pub dummies: &'a [Member],
    /// Member forced into the narrator set regardless of permissions.
    pub debug_narrator: Option<&'a Member>,
}

/// Partitions the inputs into narrators, players and spectators.
///
/// Narrator status beats spectator status. The debug narrator is a narrator
/// even when absent from the presence snapshot. Members appearing twice in
/// the snapshot are counted once.
pub fn classify(inputs: RosterInputs<'_>, is_narrator: impl Fn(&Member) -> bool) -> Roster {
    let mut roster = Roster::default();
    let mut seen: HashSet<MemberId> = HashSet::new();
    let debug_id = inputs.debug_narrator.map(|m| m.id);

    for member in inputs.raw_members {
        if !seen.insert(member.id) {
            continue;
        }
        if Some(member.id) == debug_id || is_narrator(member) {
            roster.narrators.push(member.clone());
        } else if inputs.spectators.contains(&member.id) {
            roster.spectators.push(member.clone());
        } else {
            roster.players.push(member.clone());
        }
    }

    if let Some(debug) = inputs.debug_narrator {
        if seen.insert(debug.id) {
            roster.narrators.push(debug.clone());
        }
    }

    for dummy in inputs.dummies {
        if seen.insert(dummy.id) {
            roster.players.push(dummy.clone());
        }
    }

    roster
}
