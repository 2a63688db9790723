//! Storage collaborators for status records.
//!
//! A store offers two write shapes: a single-statement upsert that commits on
//! its own, and a transaction whose upserts become visible together on
//! [`StoreTransaction::commit`]. Keys arrive already encoded (see
//! [`Key`](crate::key::Key)); a store keeps at most one status per key.

mod memory;
#[cfg(feature = "redb")]
mod redb;
#[cfg(feature = "sled")]
mod sled;

pub use memory::{MemoryStore, MemoryTransaction, MemoryUpserter};

#[cfg(feature = "redb")]
pub use self::redb::{RedbStore, RedbTransaction, RedbUpserter};
#[cfg(feature = "sled")]
pub use self::sled::{SledStore, SledTransaction, SledUpserter};
use crate::status::{Status, StatusDecodeError};

/// Error returned by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A stored value could not be decoded into a status.
    #[error("corrupt status value: {0}")]
    Decode(#[from] StatusDecodeError),
    /// The in-memory store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
    /// redb error
    #[cfg(feature = "redb")]
    #[error("redb error: {0}")]
    Redb(#[from] ::redb::Error),
    /// sled error
    #[cfg(feature = "sled")]
    #[error("sled error: {0}")]
    Sled(#[from] ::sled::Error),
    /// Failure reported by a store outside this crate.
    #[error("{0}")]
    Other(String),
}

/// A keyed status table.
pub trait StatusStore: Send + Sync {
    /// Transaction handle borrowed from the store.
    type Txn<'db>: StoreTransaction
    where
        Self: 'db;

    /// Short backend name used in logs and reports.
    fn backend_name(&self) -> &'static str;

    /// Insert `key` or overwrite its status, committed as its own unit.
    fn upsert(&self, key: &[u8], status: Status) -> Result<(), StoreError>;

    /// Open a write transaction.
    fn begin(&self) -> Result<Self::Txn<'_>, StoreError>;

    /// Current status of `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Status>, StoreError>;

    /// Number of stored keys.
    fn len(&self) -> Result<u64, StoreError>;

    /// `true` when nothing is stored.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Write transaction over a [`StatusStore`].
///
/// Dropping a transaction without committing discards its writes.
pub trait StoreTransaction {
    /// Statement handle staging upserts inside this transaction.
    type Upserter<'txn>: Upserter
    where
        Self: 'txn;

    /// Borrow a statement handle.
    fn upserter(&mut self) -> Result<Self::Upserter<'_>, StoreError>;

    /// Make every staged upsert visible at once.
    fn commit(self) -> Result<(), StoreError>;

    /// Discard every staged upsert.
    fn rollback(self) -> Result<(), StoreError>;
}

/// Insert-or-update statement bound to an open transaction.
pub trait Upserter {
    /// Stage `key -> status`, replacing any status the key already has.
    fn upsert(&mut self, key: &[u8], status: Status) -> Result<(), StoreError>;
}
