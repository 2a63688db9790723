//! Applying records to a [`StatusStore`], one per call or one chunk per
//! transaction.

use crate::{
    key::Key,
    observability::{log_debug, log_warn},
    record::Record,
    store::{StatusStore, StoreError, StoreTransaction, Upserter},
};

/// Error returned when records could not be written.
///
/// A chunk failure leaves storage as it was before the chunk: staged upserts
/// are rolled back and no retry is attempted.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Single-statement upsert failed.
    #[error("upsert of {key} failed: {source}")]
    Record {
        /// Display form of the key.
        key: String,
        /// Storage failure.
        source: StoreError,
    },
    /// The chunk transaction could not be opened.
    #[error("begin transaction failed: {0}")]
    Begin(#[source] StoreError),
    /// Staging the chunk failed; the transaction was rolled back.
    #[error("chunk upsert failed after {staged} of {len} records: {source}")]
    Stage {
        /// Records staged before the failure.
        staged: usize,
        /// Records in the chunk.
        len: usize,
        /// Storage failure.
        source: StoreError,
    },
    /// The chunk transaction did not commit.
    #[error("commit failed: {0}")]
    Commit(#[source] StoreError),
}

/// Builds one upsert per record or one atomic multi-row upsert per chunk.
pub struct BatchUpsertWriter<'s, S> {
    store: &'s S,
    key_buf: Vec<u8>,
}

impl<'s, S> BatchUpsertWriter<'s, S>
where
    S: StatusStore,
{
    /// Writer over `store`.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            key_buf: Vec::new(),
        }
    }

    /// Upsert one record outside any transaction.
    pub fn write_record<K: Key>(&mut self, record: &Record<K>) -> Result<(), WriteError> {
        self.key_buf.clear();
        record.key.encode_into(&mut self.key_buf);
        self.store
            .upsert(&self.key_buf, record.status)
            .map_err(|source| WriteError::Record {
                key: record.key.to_string(),
                source,
            })
    }

    /// Upsert every record of `chunk` in one transaction. Either all records
    /// become visible or none do. Returns the number of records written.
    pub fn write_chunk<K: Key>(&mut self, chunk: &[Record<K>]) -> Result<usize, WriteError> {
        if chunk.is_empty() {
            return Ok(0);
        }

        let mut txn = self.store.begin().map_err(WriteError::Begin)?;
        if let Err((staged, source)) = stage(&mut txn, chunk, &mut self.key_buf) {
            if let Err(rollback) = txn.rollback() {
                log_warn!(
                    component = "writer",
                    event = "rollback_failed",
                    backend = self.store.backend_name(),
                    error = %rollback,
                );
            }
            return Err(WriteError::Stage {
                staged,
                len: chunk.len(),
                source,
            });
        }
        txn.commit().map_err(WriteError::Commit)?;

        log_debug!(
            component = "writer",
            event = "chunk_committed",
            backend = self.store.backend_name(),
            records = chunk.len(),
        );
        Ok(chunk.len())
    }
}

fn stage<T, K>(
    txn: &mut T,
    chunk: &[Record<K>],
    key_buf: &mut Vec<u8>,
) -> Result<(), (usize, StoreError)>
where
    T: StoreTransaction,
    K: Key,
{
    let mut upserter = txn.upserter().map_err(|err| (0, err))?;
    for (staged, record) in chunk.iter().enumerate() {
        key_buf.clear();
        record.key.encode_into(key_buf);
        upserter
            .upsert(key_buf.as_slice(), record.status)
            .map_err(|err| (staged, err))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::BatchUpsertWriter;
    use crate::{
        key::Key,
        record::Record,
        status::Status,
        store::{MemoryStore, StatusStore},
    };

    #[test]
    fn later_chunk_overwrites_earlier_status() {
        let store = MemoryStore::new();
        let mut writer = BatchUpsertWriter::new(&store);
        writer
            .write_chunk(&[
                Record::new(1u64, Status::Online),
                Record::new(2, Status::Online),
            ])
            .unwrap();
        writer
            .write_chunk(&[Record::new(1u64, Status::Offline)])
            .unwrap();

        assert_eq!(store.get(&1u64.encode()).unwrap(), Some(Status::Offline));
        assert_eq!(store.get(&2u64.encode()).unwrap(), Some(Status::Online));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn same_chunk_twice_is_idempotent() {
        let store = MemoryStore::new();
        let chunk: Vec<Record<u64>> = (0..50)
            .map(|k| {
                let status = if k % 3 == 0 {
                    Status::Offline
                } else {
                    Status::Online
                };
                Record::new(k, status)
            })
            .collect();
        let mut writer = BatchUpsertWriter::new(&store);

        assert_eq!(writer.write_chunk(&chunk).unwrap(), 50);
        let once = store.snapshot().unwrap();
        writer.write_chunk(&chunk).unwrap();
        assert_eq!(store.snapshot().unwrap(), once);
    }

    #[test]
    fn serial_records_and_empty_chunk() {
        let store = MemoryStore::new();
        let mut writer = BatchUpsertWriter::new(&store);
        assert_eq!(writer.write_chunk::<u64>(&[]).unwrap(), 0);
        writer
            .write_record(&Record::new(String::from("k1"), Status::Online))
            .unwrap();
        writer
            .write_record(&Record::new(String::from("k1"), Status::Offline))
            .unwrap();
        assert_eq!(store.get(b"k1").unwrap(), Some(Status::Offline));
        assert_eq!(store.len().unwrap(), 1);
    }
}
