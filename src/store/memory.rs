use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use super::{StatusStore, StoreError, StoreTransaction, Upserter};
use crate::status::Status;

/// Ordered in-memory status table.
///
/// Transactions stage their writes locally and apply them under a single lock
/// acquisition on commit, so readers never observe half of a chunk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<Vec<u8>, Status>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored row, ordered by encoded key.
    pub fn snapshot(&self) -> Result<BTreeMap<Vec<u8>, Status>, StoreError> {
        Ok(self.rows()?.clone())
    }

    fn rows(&self) -> Result<MutexGuard<'_, BTreeMap<Vec<u8>, Status>>, StoreError> {
        self.rows.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl StatusStore for MemoryStore {
    type Txn<'db> = MemoryTransaction<'db>;

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn upsert(&self, key: &[u8], status: Status) -> Result<(), StoreError> {
        self.rows()?.insert(key.to_vec(), status);
        Ok(())
    }

    fn begin(&self) -> Result<Self::Txn<'_>, StoreError> {
        Ok(MemoryTransaction {
            store: self,
            staged: Vec::new(),
        })
    }

    fn get(&self, key: &[u8]) -> Result<Option<Status>, StoreError> {
        Ok(self.rows()?.get(key).copied())
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(self.rows()?.len() as u64)
    }
}

/// Write transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction<'db> {
    store: &'db MemoryStore,
    staged: Vec<(Vec<u8>, Status)>,
}

impl StoreTransaction for MemoryTransaction<'_> {
    type Upserter<'txn>
        = MemoryUpserter<'txn>
    where
        Self: 'txn;

    fn upserter(&mut self) -> Result<Self::Upserter<'_>, StoreError> {
        Ok(MemoryUpserter {
            staged: &mut self.staged,
        })
    }

    fn commit(self) -> Result<(), StoreError> {
        let mut rows = self.store.rows()?;
        for (key, status) in self.staged {
            rows.insert(key, status);
        }
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Statement handle of a [`MemoryTransaction`].
#[derive(Debug)]
pub struct MemoryUpserter<'txn> {
    staged: &'txn mut Vec<(Vec<u8>, Status)>,
}

impl Upserter for MemoryUpserter<'_> {
    fn upsert(&mut self, key: &[u8], status: Status) -> Result<(), StoreError> {
        self.staged.push((key.to_vec(), status));
        Ok(())
    }
}
