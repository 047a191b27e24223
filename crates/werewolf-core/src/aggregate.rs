//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for in-memory aggregate roots that record the events their
/// commands produce.
///
/// Games are never persisted, so there is no replay path: commands mutate
/// state directly and append an event describing what changed.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events recorded and drained).
    fn version(&self) -> i64;

    /// Returns events recorded since the last drain.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Removes and returns events recorded since the last drain, advancing
    /// the version past them.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;
}
