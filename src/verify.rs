use serde::Serialize;

use crate::{
    key::Key,
    store::{StatusStore, StoreError},
};

/// Read-back of a key space against a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    /// Keys looked up.
    pub expected: u64,
    /// Keys that have a stored status.
    pub found: u64,
    /// Keys with no stored status.
    pub missing: u64,
    /// Rows in the store, including rows outside the key space.
    pub stored_rows: u64,
}

impl Coverage {
    /// Every key has a status.
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

/// Look up every key of `keys` in `store`.
pub fn verify_coverage<K, S>(store: &S, keys: &[K]) -> Result<Coverage, StoreError>
where
    K: Key,
    S: StatusStore,
{
    let mut buf = Vec::new();
    let mut found = 0u64;
    for key in keys {
        buf.clear();
        key.encode_into(&mut buf);
        if store.get(&buf)?.is_some() {
            found += 1;
        }
    }
    let expected = keys.len() as u64;
    Ok(Coverage {
        expected,
        found,
        missing: expected - found,
        stored_rows: store.len()?,
    })
}

#[cfg(test)]
mod tests {
    use super::verify_coverage;
    use crate::{
        key::Key,
        status::Status,
        store::{MemoryStore, StatusStore},
    };

    #[test]
    fn reports_missing_and_extra_rows() {
        let store = MemoryStore::new();
        for key in [1u64, 2, 3, 99] {
            store.upsert(&key.encode(), Status::Online).unwrap();
        }
        let coverage = verify_coverage(&store, &[1u64, 2, 3, 4]).unwrap();
        assert_eq!(coverage.expected, 4);
        assert_eq!(coverage.found, 3);
        assert_eq!(coverage.missing, 1);
        assert_eq!(coverage.stored_rows, 4);
        assert!(!coverage.is_complete());
    }
}
