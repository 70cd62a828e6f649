use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{PendingWrite, UnsyncedLedger};
use crate::error::LocalStoreError;

/// In-memory ledger for tests/dev. Entries are kept in recorded order.
#[derive(Debug, Default)]
pub struct InMemoryUnsyncedLedger {
    entries: Mutex<Vec<PendingWrite>>,
}

impl InMemoryUnsyncedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, Vec<PendingWrite>>, LocalStoreError> {
        self.entries
            .lock()
            .map_err(|_| LocalStoreError::failure("lock poisoned"))
    }
}

#[async_trait]
impl UnsyncedLedger for InMemoryUnsyncedLedger {
    async fn record(&self, write: PendingWrite) -> Result<(), LocalStoreError> {
        let mut entries = self.entries()?;
        entries.retain(|e| e.recipe_id != write.recipe_id);
        entries.push(write);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PendingWrite>, LocalStoreError> {
        Ok(self.entries()?.clone())
    }

    async fn mark_attempt_failed(&self, id: Uuid, error: String) -> Result<(), LocalStoreError> {
        let mut entries = self.entries()?;
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.attempts += 1;
            entry.last_error = Some(error);
            entry.last_attempt_at = Utc::now();
        }
        Ok(())
    }

    async fn resolve(&self, id: Uuid) -> Result<(), LocalStoreError> {
        self.entries()?.retain(|e| e.id != id);
        Ok(())
    }
}
