//! State synchronization engine.
//!
//! [`SyncCoordinator`] owns the authoritative playlist and presence
//! registry, funnels every mutation through one lock, fans results out on
//! the [`BroadcastBus`](jamlist_events::BroadcastBus), and mirrors changes
//! to the durable store through the [`PersistenceWorker`].

pub mod coordinator;
pub mod persistence;

pub use coordinator::{AddOutcome, ClearOutcome, RemoveOutcome, SyncCoordinator};
pub use persistence::{PersistenceQueue, PersistenceWorker, DEFAULT_PERSISTENCE_TIMEOUT};
