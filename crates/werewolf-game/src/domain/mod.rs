//! Game domain: roles, roster classification, allocation and the game
//! aggregate.

pub mod aggregates;
pub mod allocator;
pub mod commands;
pub mod events;
pub mod roles;
pub mod roster;
