//! Shared test mocks and utilities for the Werewolf session engine.

mod clock;
mod membership;
mod rng;

pub use clock::FixedClock;
pub use membership::{FailingMembershipSource, StaticMembershipSource, StaticNarratorDirectory};
pub use rng::{MockRng, SequenceRng};
