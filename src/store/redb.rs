use std::path::Path;

use redb::{Database, ReadableTableMetadata, TableDefinition};

use super::{StatusStore, StoreError, StoreTransaction, Upserter};
use crate::status::Status;

const STATUSES: TableDefinition<&[u8], u8> = TableDefinition::new("ip_statuses");

fn redb_error(err: impl Into<redb::Error>) -> StoreError {
    StoreError::Redb(err.into())
}

/// Status table in a single-file redb database.
///
/// redb admits one write transaction at a time, so concurrent chunk writers
/// queue on [`StatusStore::begin`] and each chunk commits atomically.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database file at `path` and make sure the status
    /// table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(redb_error)?;
        let txn = db.begin_write().map_err(redb_error)?;
        txn.open_table(STATUSES).map_err(redb_error)?;
        txn.commit().map_err(redb_error)?;
        Ok(Self { db })
    }
}

impl StatusStore for RedbStore {
    type Txn<'db> = RedbTransaction;

    fn backend_name(&self) -> &'static str {
        "redb"
    }

    fn upsert(&self, key: &[u8], status: Status) -> Result<(), StoreError> {
        let mut txn = self.begin()?;
        txn.upserter()?.upsert(key, status)?;
        txn.commit()
    }

    fn begin(&self) -> Result<Self::Txn<'_>, StoreError> {
        let txn = self.db.begin_write().map_err(redb_error)?;
        Ok(RedbTransaction { txn })
    }

    fn get(&self, key: &[u8]) -> Result<Option<Status>, StoreError> {
        let txn = self.db.begin_read().map_err(redb_error)?;
        let table = txn.open_table(STATUSES).map_err(redb_error)?;
        let value = table.get(key).map_err(redb_error)?;
        match value {
            Some(guard) => Ok(Some(Status::from_code(guard.value())?)),
            None => Ok(None),
        }
    }

    fn len(&self) -> Result<u64, StoreError> {
        let txn = self.db.begin_read().map_err(redb_error)?;
        let table = txn.open_table(STATUSES).map_err(redb_error)?;
        table.len().map_err(redb_error)
    }
}

/// One redb write transaction.
pub struct RedbTransaction {
    txn: redb::WriteTransaction,
}

impl StoreTransaction for RedbTransaction {
    type Upserter<'txn> = RedbUpserter<'txn>;

    fn upserter(&mut self) -> Result<Self::Upserter<'_>, StoreError> {
        let table = self.txn.open_table(STATUSES).map_err(redb_error)?;
        Ok(RedbUpserter { table })
    }

    fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(redb_error)
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.txn.abort().map_err(redb_error)
    }
}

/// Open status table inside a [`RedbTransaction`].
pub struct RedbUpserter<'txn> {
    table: redb::Table<'txn, &'static [u8], u8>,
}

impl Upserter for RedbUpserter<'_> {
    fn upsert(&mut self, key: &[u8], status: Status) -> Result<(), StoreError> {
        self.table
            .insert(key, status.code())
            .map(|_| ())
            .map_err(redb_error)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::RedbStore;
    use crate::{
        status::Status,
        store::{StatusStore, StoreTransaction, Upserter},
    };

    #[test]
    fn chunk_commit_and_abort() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path().join("statuses.redb")).unwrap();

        let mut txn = store.begin().unwrap();
        {
            let mut upserter = txn.upserter().unwrap();
            upserter.upsert(b"k1", Status::Online).unwrap();
            upserter.upsert(b"k2", Status::Online).unwrap();
        }
        txn.commit().unwrap();

        let mut txn = store.begin().unwrap();
        txn.upserter().unwrap().upsert(b"k1", Status::Offline).unwrap();
        txn.rollback().unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get(b"k1").unwrap(), Some(Status::Online));
        assert_eq!(store.get(b"k3").unwrap(), None);
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("statuses.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.upsert(b"k1", Status::Online).unwrap();
            store.upsert(b"k1", Status::Offline).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get(b"k1").unwrap(), Some(Status::Offline));
    }
}
