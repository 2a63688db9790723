//! The closed status set and the random assignment of statuses to keys.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{key::Key, record::Record};

/// Last known state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The address answered.
    Online,
    /// The address did not answer.
    Offline,
}

/// Error returned when a stored status byte or string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusDecodeError {
    /// Unknown one-byte storage code.
    #[error("unknown status code {0}")]
    Code(u8),
    /// Unknown textual status.
    #[error("unknown status {0:?}")]
    Name(String),
}

impl Status {
    /// Every status, in storage-code order.
    pub const ALL: [Status; 2] = [Status::Online, Status::Offline];

    /// One-byte storage code.
    pub const fn code(self) -> u8 {
        match self {
            Status::Online => 0,
            Status::Offline => 1,
        }
    }

    /// Inverse of [`Status::code`].
    pub fn from_code(code: u8) -> Result<Self, StatusDecodeError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(StatusDecodeError::Code(code))
    }

    /// Text form written in logs and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Offline => "offline",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StatusDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusDecodeError::Name(s.to_string()))
    }
}

/// Draws a status uniformly from [`Status::ALL`] for each key.
///
/// Every worker owns its assigner, so no random state is shared across
/// threads. Seed the injected generator to get a reproducible sequence.
#[derive(Debug, Clone)]
pub struct StatusAssigner {
    rng: fastrand::Rng,
}

impl StatusAssigner {
    /// Assigner drawing from `rng`.
    pub fn new(rng: fastrand::Rng) -> Self {
        Self { rng }
    }

    /// Assigner with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(fastrand::Rng::with_seed(seed))
    }

    /// Status for `key`. The key does not influence the draw; it is taken so
    /// callers can swap in key-dependent assignment without changing call sites.
    pub fn assign<K: Key>(&mut self, _key: &K) -> Status {
        Status::ALL[self.rng.usize(..Status::ALL.len())]
    }

    /// Build the records for one chunk of keys, in key order.
    pub fn assign_chunk<K: Key>(&mut self, keys: &[K]) -> Vec<Record<K>> {
        keys.iter()
            .map(|key| Record::new(key.clone(), self.assign(key)))
            .collect()
    }
}
