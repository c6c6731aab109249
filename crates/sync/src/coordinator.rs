//! The single serialization point for playlist and presence state.
//!
//! Every mutation, whichever transport it arrived on, runs the same
//! sequence: validate, apply in memory, broadcast, then learn whether the
//! durable write succeeded. Validation failures and unknown ids are
//! rejected before anything changes. Durable-store failures never undo or
//! block an applied mutation; they only turn `persisted` false.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jamlist_core::error::CoreError;
use jamlist_core::playlist::{Entry, NewEntry, PlaylistStore};
use jamlist_core::presence::{Participant, PresenceRegistry};
use jamlist_core::protocol::{ServerMessage, StateAction};
use jamlist_core::types::{new_entry_id, ConnectionId};
use jamlist_db::{PersistenceRecord, SharedAdapter};
use jamlist_events::BroadcastBus;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::persistence::{PendingWrite, PersistenceQueue, PersistenceWorker};

/// Result of a successful add.
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub entry: Entry,
    pub persisted: bool,
}

/// Result of a successful remove.
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    pub entry: Entry,
    pub persisted: bool,
}

/// Result of a clear.
#[derive(Debug, Clone)]
pub struct ClearOutcome {
    /// Entries that were in the playlist before it was cleared.
    pub removed: Vec<Entry>,
    pub persisted: bool,
}

struct SyncState {
    playlist: PlaylistStore,
    presence: PresenceRegistry,
}

/// Orchestrates playlist mutations, presence, broadcast and persistence.
///
/// Designed to be wrapped in `Arc` and shared by every transport handler.
pub struct SyncCoordinator {
    state: Mutex<SyncState>,
    bus: Arc<BroadcastBus<ServerMessage>>,
    /// `None` when no durable backend is available.
    persistence: Option<PersistenceQueue>,
}

impl SyncCoordinator {
    /// Build a coordinator around an existing queue (or none).
    pub fn new(bus: Arc<BroadcastBus<ServerMessage>>, persistence: Option<PersistenceQueue>) -> Self {
        Self {
            state: Mutex::new(SyncState {
                playlist: PlaylistStore::new(),
                presence: PresenceRegistry::new(),
            }),
            bus,
            persistence,
        }
    }

    /// Build a coordinator for `adapter`, spawning the persistence worker
    /// if (and only if) the adapter reports itself available.
    ///
    /// The returned handle, if any, completes once the worker has drained
    /// after `cancel` fires.
    pub fn start(
        adapter: SharedAdapter,
        bus: Arc<BroadcastBus<ServerMessage>>,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> (Self, Option<JoinHandle<()>>) {
        if !adapter.is_available() {
            tracing::info!("No durable backend available, running in memory-only mode");
            return (Self::new(bus, None), None);
        }

        let (queue, handle) = PersistenceWorker::new(adapter, timeout).spawn(cancel);
        (Self::new(bus, Some(queue)), Some(handle))
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn bus(&self) -> &Arc<BroadcastBus<ServerMessage>> {
        &self.bus
    }

    // -----------------------------------------------------------------------
    // Reads and reconciliation
    // -----------------------------------------------------------------------

    /// Startup reconciliation: load the durable store into memory.
    ///
    /// Returns the number of entries loaded. A failure leaves the playlist
    /// empty and is only logged.
    pub async fn bootstrap(&self) -> usize {
        if self.persistence.is_none() {
            return 0;
        }
        let entries = self.playlist().await;
        tracing::info!(count = entries.len(), "Loaded playlist from durable store");
        entries.len()
    }

    /// The current playlist.
    ///
    /// When a durable backend is available it is treated as authoritative:
    /// its contents replace the in-memory playlist before returning. If the
    /// load fails, the last known in-memory playlist is served instead.
    pub async fn playlist(&self) -> Vec<Entry> {
        if let Some(queue) = &self.persistence {
            match queue.load_all().await {
                Ok(records) => {
                    let now = Utc::now();
                    let entries: Vec<Entry> = records
                        .into_iter()
                        .map(|record| record.into_entry(now))
                        .collect();
                    let mut state = self.state.lock().await;
                    for rejected in state.playlist.replace_all(entries) {
                        tracing::warn!(
                            entry_id = %rejected.id,
                            title = %rejected.title,
                            "Skipping durable row: duplicate id or missing required field",
                        );
                    }
                    return state.playlist.list_all();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reconciliation failed, serving in-memory playlist");
                }
            }
        }
        self.snapshot().await
    }

    /// The in-memory playlist, without consulting the durable store.
    pub async fn snapshot(&self) -> Vec<Entry> {
        self.state.lock().await.playlist.list_all()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Validate and append a new entry, broadcast it, then wait for the
    /// durable write.
    pub async fn add_entry(
        &self,
        input: NewEntry,
        contributor_id: Option<ConnectionId>,
    ) -> Result<AddOutcome, CoreError> {
        let (entry, pending) = self.apply_add(input, contributor_id).await?;
        let persisted = pending.outcome().await;
        log_added(&entry, persisted);
        Ok(AddOutcome { entry, persisted })
    }

    /// Like [`add_entry`](Self::add_entry), but returns as soon as the entry
    /// is applied and broadcast. The durable outcome is only logged.
    pub async fn add_entry_detached(
        &self,
        input: NewEntry,
        contributor_id: Option<ConnectionId>,
    ) -> Result<Entry, CoreError> {
        let (entry, pending) = self.apply_add(input, contributor_id).await?;
        let logged = entry.clone();
        tokio::spawn(async move {
            let persisted = pending.outcome().await;
            log_added(&logged, persisted);
        });
        Ok(entry)
    }

    /// Remove an entry by id, broadcast the removal, then wait for the
    /// durable write.
    pub async fn remove_entry(&self, id: &str) -> Result<RemoveOutcome, CoreError> {
        let (entry, pending) = self.apply_remove(id).await?;
        let persisted = pending.outcome().await;
        tracing::info!(entry_id = %entry.id, persisted, "Song removed");
        Ok(RemoveOutcome { entry, persisted })
    }

    /// Like [`remove_entry`](Self::remove_entry), without waiting for the
    /// durable write.
    pub async fn remove_entry_detached(&self, id: &str) -> Result<Entry, CoreError> {
        let (entry, pending) = self.apply_remove(id).await?;
        let entry_id = entry.id.clone();
        tokio::spawn(async move {
            let persisted = pending.outcome().await;
            tracing::info!(entry_id = %entry_id, persisted, "Song removed");
        });
        Ok(entry)
    }

    /// Empty the playlist and broadcast the (empty) result.
    pub async fn clear(&self) -> ClearOutcome {
        let (removed, pending) = {
            let mut state = self.state.lock().await;
            let removed = state.playlist.clear();

            let pending = match &self.persistence {
                Some(queue) => queue.clear(),
                None => PendingWrite::skipped(),
            };

            self.bus
                .publish(ServerMessage::StateChanged {
                    action: StateAction::Clear,
                    entry: None,
                    playlist: Vec::new(),
                })
                .await;
            (removed, pending)
        };

        let persisted = pending.outcome().await;
        tracing::info!(removed = removed.len(), persisted, "Playlist cleared");
        ClearOutcome { removed, persisted }
    }

    /// Validate, append, queue the durable write and broadcast, all under
    /// the state lock.
    async fn apply_add(
        &self,
        input: NewEntry,
        contributor_id: Option<ConnectionId>,
    ) -> Result<(Entry, PendingWrite), CoreError> {
        let valid = input.validate()?;

        let mut state = self.state.lock().await;
        let added_at = state.playlist.next_added_at(Utc::now());
        let entry = valid.into_entry(new_entry_id(), contributor_id, added_at);
        state.playlist.append(entry.clone());

        let pending = match &self.persistence {
            Some(queue) => queue.append(PersistenceRecord::from(&entry)),
            None => PendingWrite::skipped(),
        };

        self.bus
            .publish(ServerMessage::StateChanged {
                action: StateAction::Add,
                entry: Some(entry.clone()),
                playlist: state.playlist.list_all(),
            })
            .await;
        Ok((entry, pending))
    }

    async fn apply_remove(&self, id: &str) -> Result<(Entry, PendingWrite), CoreError> {
        let mut state = self.state.lock().await;
        let entry = state.playlist.remove_by_id(id)?;

        let pending = match &self.persistence {
            Some(queue) => queue.remove(entry.id.clone()),
            None => PendingWrite::skipped(),
        };

        self.bus
            .publish(ServerMessage::StateChanged {
                action: StateAction::Remove,
                entry: Some(entry.clone()),
                playlist: state.playlist.list_all(),
            })
            .await;
        Ok((entry, pending))
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    /// Register `connection_id` as a participant, replay the playlist to it
    /// alone, then broadcast the updated participant list.
    pub async fn join(&self, connection_id: &str, display_name: String) {
        let participants = {
            let mut state = self.state.lock().await;
            state
                .presence
                .join(connection_id.to_string(), display_name.clone());

            self.bus
                .send_to(
                    connection_id,
                    ServerMessage::InitialState {
                        playlist: state.playlist.list_all(),
                    },
                )
                .await;
            self.bus
                .publish(ServerMessage::participants_changed(state.presence.list_all()))
                .await;
            state.presence.len()
        };

        tracing::info!(
            conn_id = %connection_id,
            display_name = %display_name,
            participants,
            "Participant joined",
        );
    }

    /// Forget `connection_id` and broadcast the updated participant list.
    ///
    /// Entries the participant added stay in the playlist.
    pub async fn leave(&self, connection_id: &str) {
        let mut state = self.state.lock().await;
        let display_name = state.presence.leave(connection_id);
        self.bus
            .publish(ServerMessage::participants_changed(state.presence.list_all()))
            .await;

        tracing::info!(
            conn_id = %connection_id,
            display_name = display_name.as_deref().unwrap_or("<never joined>"),
            participants = state.presence.len(),
            "Participant left",
        );
    }

    pub async fn participants(&self) -> Vec<Participant> {
        self.state.lock().await.presence.list_all()
    }

    /// Display name `connection_id` joined with, if it has joined.
    pub async fn display_name(&self, connection_id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .presence
            .display_name(connection_id)
            .map(str::to_string)
    }
}

fn log_added(entry: &Entry, persisted: bool) {
    tracing::info!(
        entry_id = %entry.id,
        title = %entry.title,
        added_by = %entry.added_by,
        persisted,
        "Song added",
    );
}
