//! Run results: per-worker timings, JSON output and a console table.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use comfy_table::Table;
use serde::Serialize;

use crate::{
    orchestrator::{RunError, RunState},
    partition::ChunkSize,
    strategy::{ExecutionPlan, Strategy, Traversal, WorkerPlan, WriteMode},
    verify::Coverage,
    worker::PassProgress,
};

/// Default directory for JSON reports.
pub const DEFAULT_RESULTS_ROOT: &str = "target/scanstore-results";

/// Error returned when a report cannot be persisted.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Filesystem failure.
    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure.
    #[error("report encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Final outcome of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerOutcome {
    /// The whole pass committed.
    Completed,
    /// The pass stopped early.
    Failed,
}

/// What one worker did.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    /// 1-based worker id.
    pub worker: usize,
    /// Traversal order of the pass.
    pub traversal: Traversal,
    /// How the pass ended.
    pub outcome: WorkerOutcome,
    /// Committed storage calls.
    pub chunks_written: usize,
    /// Committed records.
    pub records_written: usize,
    /// Wall time of the pass.
    pub elapsed_ms: u64,
    /// `records_written` per second of wall time.
    pub records_per_sec: f64,
    /// Failure text for failed workers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReport {
    pub(crate) fn new(
        plan: WorkerPlan,
        progress: PassProgress,
        outcome: WorkerOutcome,
        error: Option<String>,
    ) -> Self {
        Self {
            worker: plan.id,
            traversal: plan.traversal,
            outcome,
            chunks_written: progress.chunks,
            records_written: progress.records,
            elapsed_ms: progress.elapsed.as_millis() as u64,
            records_per_sec: per_sec(progress.records, progress.elapsed),
            error,
        }
    }
}

fn per_sec(count: usize, elapsed: Duration) -> f64 {
    count as f64 / elapsed.as_secs_f64().max(0.000_001)
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique, time-ordered run id.
    pub run_id: String,
    /// Strategy that was executed.
    pub strategy: Strategy,
    /// Write granularity.
    pub mode: WriteMode,
    /// Backend name.
    pub backend: &'static str,
    /// Keys in the key space.
    pub key_count: usize,
    /// Records per storage call.
    pub chunk_size: ChunkSize,
    /// Final orchestrator state.
    pub state: RunState,
    /// Wall time from first launch to last join.
    pub elapsed_ms: u64,
    /// One entry per worker, in id order.
    pub workers: Vec<WorkerReport>,
    /// Post-run read-back, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
}

impl RunReport {
    pub(crate) fn new(
        plan: &ExecutionPlan,
        backend: &'static str,
        key_count: usize,
        state: RunState,
        elapsed: Duration,
        workers: Vec<WorkerReport>,
    ) -> Self {
        Self {
            run_id: ulid::Ulid::new().to_string(),
            strategy: plan.strategy(),
            mode: plan.mode(),
            backend,
            key_count,
            chunk_size: plan.mode().chunk_size(),
            state,
            elapsed_ms: elapsed.as_millis() as u64,
            workers,
            coverage: None,
        }
    }

    /// Attach a read-back result.
    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// Workers that did not finish their pass.
    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers
            .iter()
            .filter(|worker| worker.outcome == WorkerOutcome::Failed)
    }

    /// `Err` when any worker failed.
    pub fn ensure_completed(&self) -> Result<(), RunError> {
        let failed: Vec<&WorkerReport> = self.failed_workers().collect();
        match failed.first() {
            None => Ok(()),
            Some(first) => Err(RunError::WorkersFailed {
                failed: failed.len(),
                total: self.workers.len(),
                first: first.error.clone().unwrap_or_default(),
            }),
        }
    }

    /// Write the report as pretty JSON to `<root>/<run_id>/<strategy>.json`.
    pub fn write_json(&self, root: impl AsRef<Path>) -> Result<PathBuf, ReportError> {
        let dir = root.as_ref().join(&self.run_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", self.strategy.name()));
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    /// One row per worker.
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_width(100);
        table.set_header([
            "worker",
            "traversal",
            "outcome",
            "chunks",
            "records",
            "elapsed",
            "records/s",
        ]);
        for worker in &self.workers {
            table.add_row([
                format!("{} of {}", worker.worker, self.workers.len()),
                format!("{:?}", worker.traversal).to_lowercase(),
                format!("{:?}", worker.outcome).to_lowercase(),
                worker.chunks_written.to_string(),
                worker.records_written.to_string(),
                format!("{}ms", worker.elapsed_ms),
                format!("{:.0}", worker.records_per_sec),
            ]);
        }
        table
    }
}
