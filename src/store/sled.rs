use std::path::Path;

use super::{StatusStore, StoreError, StoreTransaction, Upserter};
use crate::status::Status;

const TREE: &str = "ip_statuses";

/// Status tree in a sled database. A transaction is a [`sled::Batch`] applied
/// atomically on commit.
pub struct SledStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Open or create the database directory at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TREE)?;
        Ok(Self { _db: db, tree })
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}

impl StatusStore for SledStore {
    type Txn<'db> = SledTransaction<'db>;

    fn backend_name(&self) -> &'static str {
        "sled"
    }

    fn upsert(&self, key: &[u8], status: Status) -> Result<(), StoreError> {
        self.tree.insert(key, vec![status.code()])?;
        Ok(())
    }

    fn begin(&self) -> Result<Self::Txn<'_>, StoreError> {
        Ok(SledTransaction {
            tree: &self.tree,
            batch: sled::Batch::default(),
        })
    }

    fn get(&self, key: &[u8]) -> Result<Option<Status>, StoreError> {
        match self.tree.get(key)? {
            Some(value) => match value.first() {
                Some(code) => Ok(Some(Status::from_code(*code)?)),
                None => Err(StoreError::Other(format!(
                    "empty status value for key {key:?}"
                ))),
            },
            None => Ok(None),
        }
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(self.tree.len() as u64)
    }
}

/// Pending [`sled::Batch`] against a [`SledStore`].
pub struct SledTransaction<'db> {
    tree: &'db sled::Tree,
    batch: sled::Batch,
}

impl StoreTransaction for SledTransaction<'_> {
    type Upserter<'txn>
        = SledUpserter<'txn>
    where
        Self: 'txn;

    fn upserter(&mut self) -> Result<Self::Upserter<'_>, StoreError> {
        Ok(SledUpserter {
            batch: &mut self.batch,
        })
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tree.apply_batch(self.batch)?;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Statement handle of a [`SledTransaction`].
pub struct SledUpserter<'txn> {
    batch: &'txn mut sled::Batch,
}

impl Upserter for SledUpserter<'_> {
    fn upsert(&mut self, key: &[u8], status: Status) -> Result<(), StoreError> {
        self.batch.insert(key, vec![status.code()]);
        Ok(())
    }
}
