//! YAML run configuration.
//!
//! Every field has a default, so an empty document describes the baseline
//! run: 5,000,000 hosts of `17.0.0.0/8`, chunks of 20000, two concurrent
//! workers, and a redb file under `target/`.

use std::{
    fmt, fs,
    net::Ipv4Addr,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    keyspace::{Ipv4KeySpace, KeySpaceError},
    partition::ChunkSize,
    report::DEFAULT_RESULTS_ROOT,
    strategy::{ExecutionPlan, Strategy, MIN_CONCURRENT_WORKERS},
};

/// Error returned for an unreadable or invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("read config {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// The document is not valid YAML for [`RunConfig`].
    #[error("parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The key-space network is invalid.
    #[error("keyspace: {0}")]
    KeySpace(#[from] KeySpaceError),
    /// The backend was not compiled in.
    #[error("backend {0} is not enabled in this build")]
    BackendUnavailable(BackendKind),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Process-local ordered map; nothing persists.
    Memory,
    /// Single-file redb database.
    Redb,
    /// sled database directory.
    Sled,
}

impl BackendKind {
    /// Location opened when `backend.path` is not set.
    pub fn default_path(self) -> Option<PathBuf> {
        match self {
            BackendKind::Memory => None,
            BackendKind::Redb => Some(PathBuf::from("target/scanstore/ip_statuses.redb")),
            BackendKind::Sled => Some(PathBuf::from("target/scanstore/ip_statuses.sled")),
        }
    }

    /// Whether this build can open the backend.
    pub const fn is_enabled(self) -> bool {
        match self {
            BackendKind::Memory => true,
            BackendKind::Redb => cfg!(feature = "redb"),
            BackendKind::Sled => cfg!(feature = "sled"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Memory => "memory",
            BackendKind::Redb => "redb",
            BackendKind::Sled => "sled",
        };
        f.write_str(name)
    }
}

/// Full run configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Where records go.
    pub backend: BackendConfig,
    /// Which keys are written.
    pub keyspace: KeySpaceConfig,
    /// Chunking.
    pub batch: BatchConfig,
    /// Worker fan-out and randomness.
    pub runtime: RuntimeConfig,
    /// Report output.
    pub report: ReportConfig,
}

/// `backend` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Backend to open.
    pub kind: BackendKind,
    /// Database file (redb) or directory (sled). Ignored by `memory`;
    /// unset means [`BackendKind::default_path`].
    pub path: Option<PathBuf>,
}

impl BackendConfig {
    /// Path the backend opens, if it has one.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| self.kind.default_path())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: if cfg!(feature = "redb") {
                BackendKind::Redb
            } else {
                BackendKind::Memory
            },
            path: None,
        }
    }
}

/// `keyspace` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeySpaceConfig {
    /// Network address.
    pub network: Ipv4Addr,
    /// Prefix length of the network.
    pub prefix_len: u8,
    /// Hosts skipped at the start of the network.
    pub offset: u64,
    /// Hosts written; `null` means all remaining hosts.
    pub count: Option<u64>,
}

impl Default for KeySpaceConfig {
    fn default() -> Self {
        Self {
            network: Ipv4Addr::new(17, 0, 0, 0),
            prefix_len: 8,
            offset: 0,
            count: Some(5_000_000),
        }
    }
}

/// `batch` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Records per chunk transaction.
    pub chunk_size: ChunkSize,
}

/// `runtime` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Workers launched by the concurrent strategies.
    pub workers: usize,
    /// Seed for reproducible shuffles and status draws.
    pub seed: Option<u64>,
    /// Read every key back after the run.
    pub verify: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: MIN_CONCURRENT_WORKERS,
            seed: None,
            verify: false,
        }
    }
}

/// `report` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Directory for JSON reports; `null` disables them.
    pub dir: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from(DEFAULT_RESULTS_ROOT)),
        }
    }
}

impl RunConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backend.kind.is_enabled() {
            return Err(ConfigError::BackendUnavailable(self.backend.kind));
        }
        if self.runtime.workers == 0 {
            return Err(ConfigError::Invalid("runtime.workers must be at least 1"));
        }
        self.key_space()?;
        Ok(())
    }

    /// Key space described by the `keyspace` section.
    pub fn key_space(&self) -> Result<Ipv4KeySpace, ConfigError> {
        Ok(Ipv4KeySpace::new(
            self.keyspace.network,
            self.keyspace.prefix_len,
        )?)
    }

    /// Enumerate the configured keys.
    pub fn keys(&self) -> Result<Vec<Ipv4Addr>, ConfigError> {
        Ok(self
            .key_space()?
            .enumerate(self.keyspace.offset, self.keyspace.count))
    }

    /// Plan for `strategy` under this configuration.
    pub fn plan(&self, strategy: Strategy) -> ExecutionPlan {
        ExecutionPlan::for_strategy(strategy, self.batch.chunk_size, self.runtime.workers)
    }
}
