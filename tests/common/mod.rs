//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap},
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use scanstore::{
    keyspace::Ipv4KeySpace,
    store::{StatusStore, StoreError, StoreTransaction, Upserter},
    Status,
};

/// `count` hosts of 10.0.0.0/16, in ascending order.
pub fn host_keys(count: u64) -> Arc<[Ipv4Addr]> {
    Ipv4KeySpace::new(Ipv4Addr::new(10, 0, 0, 0), 16)
        .expect("valid network")
        .enumerate(0, Some(count))
        .into()
}

type AssignedLog = Mutex<HashMap<Vec<u8>, BTreeSet<Status>>>;

/// Store wrapper that remembers every status ever written for a key and can
/// inject failures.
pub struct InstrumentedStore<S> {
    inner: S,
    assigned: AssignedLog,
    begins: AtomicUsize,
    fail_begin_at: Option<usize>,
    poison_key: Option<Vec<u8>>,
}

impl<S: StatusStore> InstrumentedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            assigned: Mutex::new(HashMap::new()),
            begins: AtomicUsize::new(0),
            fail_begin_at: None,
            poison_key: None,
        }
    }

    /// The `n`th call to `begin` (0-based) fails; all others succeed.
    pub fn fail_begin_at(mut self, n: usize) -> Self {
        self.fail_begin_at = Some(n);
        self
    }

    /// Any upsert of `key` fails.
    pub fn poison(mut self, key: Vec<u8>) -> Self {
        self.poison_key = Some(key);
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Every status written for `key`, committed or not.
    pub fn assigned(&self, key: &[u8]) -> BTreeSet<Status> {
        self.assigned
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn check_and_log(&self, key: &[u8], status: Status) -> Result<(), StoreError> {
        if self.poison_key.as_deref() == Some(key) {
            return Err(StoreError::Other(format!("poisoned key {key:?}")));
        }
        self.assigned
            .lock()
            .unwrap()
            .entry(key.to_vec())
            .or_default()
            .insert(status);
        Ok(())
    }
}

impl<S: StatusStore> StatusStore for InstrumentedStore<S> {
    type Txn<'db>
        = InstrumentedTxn<'db, S, S::Txn<'db>>
    where
        Self: 'db;

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    fn upsert(&self, key: &[u8], status: Status) -> Result<(), StoreError> {
        self.check_and_log(key, status)?;
        self.inner.upsert(key, status)
    }

    fn begin(&self) -> Result<Self::Txn<'_>, StoreError> {
        let n = self.begins.fetch_add(1, Ordering::SeqCst);
        if self.fail_begin_at == Some(n) {
            return Err(StoreError::Other(format!("injected begin failure #{n}")));
        }
        Ok(InstrumentedTxn {
            store: self,
            inner: self.inner.begin()?,
        })
    }

    fn get(&self, key: &[u8]) -> Result<Option<Status>, StoreError> {
        self.inner.get(key)
    }

    fn len(&self) -> Result<u64, StoreError> {
        self.inner.len()
    }
}

pub struct InstrumentedTxn<'db, S, T> {
    store: &'db InstrumentedStore<S>,
    inner: T,
}

impl<'db, S, T> StoreTransaction for InstrumentedTxn<'db, S, T>
where
    S: StatusStore,
    T: StoreTransaction,
{
    type Upserter<'txn>
        = InstrumentedUpserter<'txn, S, T::Upserter<'txn>>
    where
        Self: 'txn;

    fn upserter(&mut self) -> Result<Self::Upserter<'_>, StoreError> {
        Ok(InstrumentedUpserter {
            store: self.store,
            inner: self.inner.upserter()?,
        })
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.inner.rollback()
    }
}

pub struct InstrumentedUpserter<'txn, S, U> {
    store: &'txn InstrumentedStore<S>,
    inner: U,
}

impl<S, U> Upserter for InstrumentedUpserter<'_, S, U>
where
    S: StatusStore,
    U: Upserter,
{
    fn upsert(&mut self, key: &[u8], status: Status) -> Result<(), StoreError> {
        self.store.check_and_log(key, status)?;
        self.inner.upsert(key, status)
    }
}
