use async_trait::async_trait;

use crate::{DbError, PersistenceAdapter, PersistenceRecord};

/// Adapter used when no durable backend is configured.
///
/// Reports itself unavailable, so the sync engine never calls it; if it is
/// called anyway, reads return nothing and writes report "nothing deleted".
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAdapter;

#[async_trait]
impl PersistenceAdapter for NoopAdapter {
    fn is_available(&self) -> bool {
        false
    }

    async fn load_all(&self) -> Result<Vec<PersistenceRecord>, DbError> {
        Ok(Vec::new())
    }

    async fn append(&self, _record: &PersistenceRecord) -> Result<(), DbError> {
        Ok(())
    }

    async fn remove_by_id(&self, _id: &str) -> Result<bool, DbError> {
        Ok(false)
    }

    async fn clear_all(&self) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_is_unavailable_and_empty() {
        let adapter = NoopAdapter;
        assert!(!adapter.is_available());
        assert!(adapter.load_all().await.unwrap().is_empty());
        assert!(!adapter.remove_by_id("x").await.unwrap());
    }
}
