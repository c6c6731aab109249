//! Durable-store contract and its implementations.
//!
//! The playlist lives in memory; a [`PersistenceAdapter`] mirrors it to an
//! optional external store on a best-effort basis. Every operation can fail
//! with [`DbError`] and callers are expected to log and carry on.
//!
//! - [`NoopAdapter`]: no backend configured; always unavailable.
//! - [`InMemoryAdapter`]: process-local store, used for development and
//!   tests (supports failure injection).
//! - [`SheetsAdapter`]: rows in a spreadsheet worksheet.

pub mod error;
pub mod memory;
pub mod noop;
pub mod record;
pub mod sheets;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::DbError;
pub use memory::InMemoryAdapter;
pub use noop::NoopAdapter;
pub use record::PersistenceRecord;
pub use sheets::{SheetsAdapter, SheetsConfig};

/// Shared, type-erased adapter handle.
pub type SharedAdapter = Arc<dyn PersistenceAdapter>;

/// Abstract durable store for playlist records.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Whether a backend is configured and was reachable at startup.
    ///
    /// Decided once at construction; a later outage shows up as per-call
    /// errors instead.
    fn is_available(&self) -> bool;

    /// All stored records, in row order.
    async fn load_all(&self) -> Result<Vec<PersistenceRecord>, DbError>;

    /// Append one record at the end.
    async fn append(&self, record: &PersistenceRecord) -> Result<(), DbError>;

    /// Delete the record with `id`. Returns `false` if no row matched.
    async fn remove_by_id(&self, id: &str) -> Result<bool, DbError>;

    /// Delete every record (headers, if any, are kept).
    async fn clear_all(&self) -> Result<(), DbError>;
}
