//! Ordered, bounded access to the durable store.
//!
//! [`PersistenceWorker`] is a single long-lived task that owns the adapter
//! and executes queued operations one at a time, in the order they were
//! enqueued. The coordinator enqueues while it still holds the state lock,
//! so durable writes land in the same order the in-memory mutations were
//! applied, without the lock ever being held across I/O.
//!
//! Callers never wait longer than one timeout, counted from the moment the
//! operation was queued. A backlog behind a stalled backend makes later
//! callers give up on time instead of waiting for everything ahead of them.

use std::future::Future;
use std::time::Duration;

use jamlist_core::types::EntryId;
use jamlist_db::{DbError, PersistenceRecord, SharedAdapter};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default bound for a single durable-store call.
pub const DEFAULT_PERSISTENCE_TIMEOUT: Duration = Duration::from_secs(10);

enum PersistOp {
    Append {
        record: PersistenceRecord,
        reply: oneshot::Sender<bool>,
    },
    Remove {
        id: EntryId,
        reply: oneshot::Sender<bool>,
    },
    Clear {
        reply: oneshot::Sender<bool>,
    },
    Load {
        reply: oneshot::Sender<Result<Vec<PersistenceRecord>, DbError>>,
        deadline: Instant,
    },
}

/// Outcome of a queued write, resolved once the worker has run it.
#[must_use = "await `outcome` to learn whether the write was persisted"]
pub struct PendingWrite(Option<(oneshot::Receiver<bool>, Instant)>);

impl PendingWrite {
    /// A write that was never queued (no backend).
    pub fn skipped() -> Self {
        Self(None)
    }

    /// `true` if the durable store accepted the write before the deadline.
    ///
    /// Giving up does not cancel the write; it still runs in queue order.
    pub async fn outcome(self) -> bool {
        let Some((rx, deadline)) = self.0 else {
            return false;
        };
        match tokio::time::timeout_at(deadline, rx).await {
            Ok(result) => result.unwrap_or(false),
            Err(_) => {
                tracing::debug!("Durable write still queued at deadline, reporting not persisted");
                false
            }
        }
    }
}

/// Cloneable handle for enqueueing operations on the worker.
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<PersistOp>,
    timeout: Duration,
}

impl PersistenceQueue {
    pub fn append(&self, record: PersistenceRecord) -> PendingWrite {
        let (reply, rx) = oneshot::channel();
        self.enqueue(PersistOp::Append { record, reply }, rx)
    }

    pub fn remove(&self, id: EntryId) -> PendingWrite {
        let (reply, rx) = oneshot::channel();
        self.enqueue(PersistOp::Remove { id, reply }, rx)
    }

    pub fn clear(&self) -> PendingWrite {
        let (reply, rx) = oneshot::channel();
        self.enqueue(PersistOp::Clear { reply }, rx)
    }

    /// Load every record. Runs after all previously queued writes, and
    /// fails with [`DbError::Timeout`] if that does not happen in time.
    pub async fn load_all(&self) -> Result<Vec<PersistenceRecord>, DbError> {
        let (reply, rx) = oneshot::channel();
        let deadline = Instant::now() + self.timeout;
        self.tx
            .send(PersistOp::Load { reply, deadline })
            .map_err(|_| DbError::Unavailable("persistence worker stopped".into()))?;
        match tokio::time::timeout_at(deadline, rx).await {
            Ok(reply) => reply.map_err(|_| {
                DbError::Unavailable("persistence worker dropped the request".into())
            })?,
            Err(_) => Err(DbError::Timeout(self.timeout)),
        }
    }

    fn enqueue(&self, op: PersistOp, rx: oneshot::Receiver<bool>) -> PendingWrite {
        let deadline = Instant::now() + self.timeout;
        if self.tx.send(op).is_err() {
            tracing::warn!("Persistence worker stopped, write not queued");
            return PendingWrite::skipped();
        }
        PendingWrite(Some((rx, deadline)))
    }
}

/// Background task executing durable-store calls in queue order.
pub struct PersistenceWorker {
    adapter: SharedAdapter,
    timeout: Duration,
}

impl PersistenceWorker {
    pub fn new(adapter: SharedAdapter, timeout: Duration) -> Self {
        Self { adapter, timeout }
    }

    /// Start the worker. It stops when `cancel` fires (after draining
    /// what is already queued) or when every queue handle is dropped.
    pub fn spawn(self, cancel: CancellationToken) -> (PersistenceQueue, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = PersistenceQueue {
            tx,
            timeout: self.timeout,
        };
        let handle = tokio::spawn(self.run(rx, cancel));
        (queue, handle)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<PersistOp>, cancel: CancellationToken) {
        tracing::info!(timeout_ms = self.timeout.as_millis() as u64, "Persistence worker started");
        loop {
            tokio::select! {
                biased;
                op = rx.recv() => match op {
                    Some(op) => self.execute(op).await,
                    None => break,
                },
                _ = cancel.cancelled() => {
                    let mut drained = 0usize;
                    while let Ok(op) = rx.try_recv() {
                        self.execute(op).await;
                        drained += 1;
                    }
                    tracing::info!(drained, "Persistence worker draining on shutdown");
                    break;
                }
            }
        }
        tracing::info!("Persistence worker stopped");
    }

    async fn execute(&self, op: PersistOp) {
        match op {
            PersistOp::Append { record, reply } => {
                let ok = self
                    .bounded("append", self.adapter.append(&record))
                    .await
                    .is_ok();
                let _ = reply.send(ok);
            }
            PersistOp::Remove { id, reply } => {
                let result = self.bounded("remove_by_id", self.adapter.remove_by_id(&id)).await;
                if let Ok(false) = result {
                    tracing::debug!(entry_id = %id, "No durable row matched removed entry");
                }
                let _ = reply.send(result.is_ok());
            }
            PersistOp::Clear { reply } => {
                let ok = self.bounded("clear_all", self.adapter.clear_all()).await.is_ok();
                let _ = reply.send(ok);
            }
            PersistOp::Load { reply, deadline } => {
                // The reader has already fallen back to memory.
                if Instant::now() >= deadline {
                    tracing::debug!("Skipping expired load");
                    return;
                }
                let result = self.bounded("load_all", self.adapter.load_all()).await;
                let _ = reply.send(result);
            }
        }
    }

    /// Run one adapter call under the timeout; log any failure.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DbError>>,
    ) -> Result<T, DbError> {
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout(self.timeout)),
        };
        if let Err(e) = &result {
            tracing::warn!(operation, error = %e, "Durable store call failed, continuing in memory");
        }
        result
    }
}
