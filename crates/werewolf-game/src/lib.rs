//! Werewolf: game session bounded context.
//!
//! Responsible for classifying who is present into narrators, players
//! and spectators, dealing and adjusting hidden roles, sequencing the
//! lobby → role assignment → active lifecycle, and keeping the lobby
//! roster in step with the voice channel.

pub mod application;
pub mod domain;
