//! Role allocation: the initial deal and the narrator's adjustments.
//!
//! The multiset always holds exactly one entry per player. Adjustments
//! trade against villagers, so the length never changes after the deal.

use werewolf_core::rng::{DeterministicRng, pick_index, shuffle};

use super::roles::{Role, WOLF_RATIO, count_of};

/// Number of werewolves dealt to a table of `player_count`.
#[must_use]
pub fn werewolf_count(player_count: usize) -> usize {
    (player_count / WOLF_RATIO).max(1)
}

/// Deals the initial role multiset for `player_count` players.
///
/// Werewolves first, then special roles drawn without replacement until the
/// table is full or the pool runs dry, then villagers. The result is in deal
/// order; callers shuffle before assigning.
pub fn setup_roles(player_count: usize, rng: &mut dyn DeterministicRng) -> Vec<Role> {
    let mut roles = vec![Role::Werewolf; werewolf_count(player_count)];
    let mut pool: Vec<Role> = Role::special().collect();

    while roles.len() < player_count && !pool.is_empty() {
        let picked = pick_index(rng, pool.len());
        roles.push(pool.swap_remove(picked));
    }

    if roles.len() < player_count {
        roles.resize(player_count, Role::Villager);
    }
    roles
}

/// Permutes `roles` uniformly at random.
pub fn shuffle_roles(roles: &mut [Role], rng: &mut dyn DeterministicRng) {
    shuffle(rng, roles);
}

/// Converts one villager into `role`.
///
/// Returns `false`, leaving `roles` untouched, if no villager is left.
pub fn add_role(roles: &mut Vec<Role>, role: Role) -> bool {
    let Some(villager) = roles.iter().position(|r| *r == Role::Villager) else {
        return false;
    };
    roles.remove(villager);
    roles.push(role);
    true
}

/// Converts one `role` back into a villager.
///
/// Returns `false`, leaving `roles` untouched, if `role` is absent or it is
/// the last werewolf.
pub fn remove_role(roles: &mut Vec<Role>, role: Role) -> bool {
    if role == Role::Werewolf && count_of(roles, Role::Werewolf) <= 1 {
        return false;
    }
    let Some(found) = roles.iter().position(|r| *r == role) else {
        return false;
    };
    roles.remove(found);
    roles.push(Role::Villager);
    true
}
