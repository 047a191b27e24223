//! Werewolf: HTTP host.
//!
//! Exposes the game command surface over HTTP and stands in for the chat
//! platform: presence is pushed in, status snapshots and channel grants are
//! read back out.

pub mod config;
pub mod error;
pub mod presence;
pub mod routes;
pub mod state;
