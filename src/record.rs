use crate::status::Status;

/// Latest known status of one key, as handed to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<K> {
    /// Key the status belongs to.
    pub key: K,
    /// Status to store for `key`.
    pub status: Status,
}

impl<K> Record<K> {
    /// Pair `key` with `status`.
    pub fn new(key: K, status: Status) -> Self {
        Self { key, status }
    }
}
