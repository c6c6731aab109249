//! Process-local durable store.
//!
//! Behaves like a real backend from the sync engine's point of view: it is
//! available, keeps rows in append order, and can be told to fail or to
//! stall so degradation paths can be exercised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::{DbError, PersistenceAdapter, PersistenceRecord};

#[derive(Debug, Default)]
pub struct InMemoryAdapter {
    rows: Mutex<Vec<PersistenceRecord>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, every subsequent call fails with [`DbError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every subsequent call sleep for `delay` before doing anything.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.lock_delay() = delay;
    }

    /// Replace the stored rows directly, as an external editor would.
    pub fn seed(&self, records: Vec<PersistenceRecord>) {
        *self.lock_rows() = records;
    }

    /// Copy of the stored rows.
    pub fn records(&self) -> Vec<PersistenceRecord> {
        self.lock_rows().clone()
    }

    async fn enter(&self, op: &str) -> Result<(), DbError> {
        let delay = *self.lock_delay();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable(format!("{op} rejected: store set to fail")));
        }
        Ok(())
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, Vec<PersistenceRecord>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_delay(&self) -> std::sync::MutexGuard<'_, Option<Duration>> {
        self.delay.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PersistenceAdapter for InMemoryAdapter {
    fn is_available(&self) -> bool {
        true
    }

    async fn load_all(&self) -> Result<Vec<PersistenceRecord>, DbError> {
        self.enter("load_all").await?;
        Ok(self.records())
    }

    async fn append(&self, record: &PersistenceRecord) -> Result<(), DbError> {
        self.enter("append").await?;
        self.lock_rows().push(record.clone());
        Ok(())
    }

    async fn remove_by_id(&self, id: &str) -> Result<bool, DbError> {
        self.enter("remove_by_id").await?;
        let mut rows = self.lock_rows();
        match rows.iter().position(|r| r.id == id) {
            Some(index) => {
                rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_all(&self) -> Result<(), DbError> {
        self.enter("clear_all").await?;
        self.lock_rows().clear();
        Ok(())
    }
}
