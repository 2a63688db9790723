//! How a run issues its writes: strategies and the execution plans they
//! expand to.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::partition::ChunkSize;

/// Fewest workers a concurrent strategy launches.
pub const MIN_CONCURRENT_WORKERS: usize = 2;

/// The four supported execution modes, numbered as on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One worker, one storage call per key.
    Serial,
    /// One worker, one transaction per chunk.
    Batch,
    /// Several workers, each writing the whole key space in chunks.
    ConcurrentBatch,
    /// Like [`Strategy::ConcurrentBatch`], but workers after the first
    /// traverse their own shuffled copy of the key space.
    ConcurrentShuffledBatch,
}

/// Error returned for an unknown strategy selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy {0:?}; expected 1-4 or one of serial, batch, concurrent-batch, concurrent-shuffled-batch")]
pub struct UnknownStrategy(pub String);

impl Strategy {
    /// Every strategy, in selector order.
    pub const ALL: [Strategy; 4] = [
        Strategy::Serial,
        Strategy::Batch,
        Strategy::ConcurrentBatch,
        Strategy::ConcurrentShuffledBatch,
    ];

    /// Numeric selector, 1-based.
    pub const fn id(self) -> u8 {
        match self {
            Strategy::Serial => 1,
            Strategy::Batch => 2,
            Strategy::ConcurrentBatch => 3,
            Strategy::ConcurrentShuffledBatch => 4,
        }
    }

    /// Strategy for a numeric selector.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|strategy| strategy.id() == id)
    }

    /// Kebab-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Strategy::Serial => "serial",
            Strategy::Batch => "batch",
            Strategy::ConcurrentBatch => "concurrent-batch",
            Strategy::ConcurrentShuffledBatch => "concurrent-shuffled-batch",
        }
    }

    /// One-line description for usage output.
    pub const fn description(self) -> &'static str {
        match self {
            Strategy::Serial => "serial recording",
            Strategy::Batch => "batch recording",
            Strategy::ConcurrentBatch => "concurrent batch recording",
            Strategy::ConcurrentShuffledBatch => "concurrent batch recording with shuffled inputs",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| UnknownStrategy(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Whether a worker issues one storage call per record or per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "chunk_size")]
pub enum WriteMode {
    /// Single-statement upsert per record, no transaction.
    PerRecord,
    /// One transaction per chunk of at most this many records.
    PerChunk(ChunkSize),
}

impl WriteMode {
    /// Records per storage call.
    pub fn chunk_size(&self) -> ChunkSize {
        match self {
            WriteMode::PerRecord => ChunkSize::ONE,
            WriteMode::PerChunk(size) => *size,
        }
    }
}

/// Order in which a worker traverses the key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Source order.
    Source,
    /// A private, independently shuffled permutation.
    Shuffled,
}

/// One worker of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerPlan {
    /// 1-based worker id.
    pub id: usize,
    /// Traversal order of this worker's pass.
    pub traversal: Traversal,
}

/// Workers, their traversal orders and the write granularity of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    strategy: Strategy,
    mode: WriteMode,
    workers: Vec<WorkerPlan>,
}

impl ExecutionPlan {
    /// Expand `strategy`. `workers` only matters for the concurrent
    /// strategies and is raised to [`MIN_CONCURRENT_WORKERS`].
    pub fn for_strategy(strategy: Strategy, chunk_size: ChunkSize, workers: usize) -> Self {
        let (mode, count) = match strategy {
            Strategy::Serial => (WriteMode::PerRecord, 1),
            Strategy::Batch => (WriteMode::PerChunk(chunk_size), 1),
            Strategy::ConcurrentBatch | Strategy::ConcurrentShuffledBatch => (
                WriteMode::PerChunk(chunk_size),
                workers.max(MIN_CONCURRENT_WORKERS),
            ),
        };
        let workers = (1..=count)
            .map(|id| WorkerPlan {
                id,
                traversal: if strategy == Strategy::ConcurrentShuffledBatch && id > 1 {
                    Traversal::Shuffled
                } else {
                    Traversal::Source
                },
            })
            .collect();
        Self {
            strategy,
            mode,
            workers,
        }
    }

    /// Strategy the plan was built from.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Write granularity shared by all workers.
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Workers in id order.
    pub fn workers(&self) -> &[WorkerPlan] {
        &self.workers
    }
}
