//! Werewolf Core: shared domain abstractions.
//!
//! This crate defines the identity types, error taxonomy, and the
//! determinism seams (clock, RNG) that the game context and its hosts
//! depend on. It also declares the membership collaborators the host
//! platform must provide. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod member;
pub mod membership;
pub mod rng;
