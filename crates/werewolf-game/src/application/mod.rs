//! Application layer: session registry, command and query handlers, the
//! roster sync loop, and the outbound ports they drive.

pub mod command_handlers;
pub mod ports;
pub mod query_handlers;
pub mod registry;
pub mod roster_sync;
