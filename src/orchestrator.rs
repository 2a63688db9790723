//! Launching every worker of an [`ExecutionPlan`] and waiting for all of
//! them.
//!
//! Workers share nothing but the store. A failed worker stops its own pass;
//! its siblings are never signalled and run to their own end. The run is
//! over only once every launched worker has returned.

use std::{fmt, sync::Arc, time::Instant};

use futures_util::future::join_all;
use serde::Serialize;

use crate::{
    key::Key,
    observability::{log_error, log_info, log_warn},
    report::{RunReport, WorkerOutcome, WorkerReport},
    store::StatusStore,
    strategy::ExecutionPlan,
    worker::{PassProgress, WorkerPass},
};

/// Lifecycle of an [`Orchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started.
    Idle,
    /// Workers are in flight.
    Running,
    /// Every worker finished its pass.
    Completed,
    /// At least one worker stopped on a write failure or panicked.
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Error returned by the orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// `run` was called on an orchestrator that already left `Idle`.
    #[error("orchestrator already {0}")]
    AlreadyStarted(RunState),
    /// The run finished with failed workers.
    #[error("{failed} of {total} workers failed; first failure: {first}")]
    WorkersFailed {
        /// Failed workers.
        failed: usize,
        /// Launched workers.
        total: usize,
        /// Error text of the lowest-numbered failed worker.
        first: String,
    },
}

/// Owns an [`ExecutionPlan`] and drives it to completion.
#[derive(Debug)]
pub struct Orchestrator {
    plan: ExecutionPlan,
    seed: Option<u64>,
    state: RunState,
}

impl Orchestrator {
    /// Idle orchestrator for `plan`. Workers draw from entropy-seeded
    /// generators unless [`Orchestrator::with_seed`] is used.
    pub fn new(plan: ExecutionPlan) -> Self {
        Self {
            plan,
            seed: None,
            state: RunState::Idle,
        }
    }

    /// Derive every worker's generator from `seed`, making shuffles and
    /// status draws reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The plan being executed.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    fn worker_rng(&self, worker: usize) -> fastrand::Rng {
        match self.seed {
            // Distinct, well-spread seeds per worker.
            Some(seed) => fastrand::Rng::with_seed(
                seed.wrapping_add((worker as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            ),
            None => fastrand::Rng::new(),
        }
    }

    /// Run every worker of the plan over `keys` against `store` and wait for
    /// all of them. Each worker runs on the blocking pool since storage calls
    /// block the issuing thread.
    ///
    /// Worker failures do not make this return early or return `Err`; they are
    /// recorded in the report and move the state to [`RunState::Failed`].
    pub async fn run<K, S>(&mut self, keys: Arc<[K]>, store: Arc<S>) -> Result<RunReport, RunError>
    where
        K: Key,
        S: StatusStore + 'static,
    {
        if self.state != RunState::Idle {
            return Err(RunError::AlreadyStarted(self.state));
        }
        self.state = RunState::Running;

        let mode = self.plan.mode();
        let total = self.plan.workers().len();
        log_info!(
            component = "orchestrator",
            event = "run_started",
            strategy = %self.plan.strategy(),
            backend = store.backend_name(),
            workers = total,
            keys = keys.len(),
            chunk_size = %mode.chunk_size(),
        );

        let start = Instant::now();
        let mut handles = Vec::with_capacity(total);
        for worker in self.plan.workers().iter().copied() {
            let keys = Arc::clone(&keys);
            let store = Arc::clone(&store);
            let rng = self.worker_rng(worker.id);
            log_info!(
                component = "orchestrator",
                event = "worker_started",
                worker = worker.id,
                of = total,
                traversal = ?worker.traversal,
                keys = keys.len(),
            );
            let handle = tokio::task::spawn_blocking(move || {
                WorkerPass::new(worker, mode, store.as_ref(), rng).run(&keys[..])
            });
            handles.push(handle);
        }

        let joined = join_all(handles).await;
        let mut workers = Vec::with_capacity(total);
        for (plan, result) in self.plan.workers().iter().zip(joined) {
            let report = match result {
                Ok(Ok(progress)) => {
                    log_info!(
                        component = "orchestrator",
                        event = "worker_completed",
                        worker = plan.id,
                        chunks = progress.chunks,
                        records = progress.records,
                        elapsed_ms = progress.elapsed.as_millis() as u64,
                    );
                    WorkerReport::new(*plan, progress, WorkerOutcome::Completed, None)
                }
                Ok(Err(err)) => {
                    log_error!(
                        component = "orchestrator",
                        event = "worker_failed",
                        worker = plan.id,
                        records = err.progress.records,
                        error = %err,
                    );
                    let text = err.to_string();
                    WorkerReport::new(*plan, err.progress, WorkerOutcome::Failed, Some(text))
                }
                Err(join) => {
                    log_warn!(
                        component = "orchestrator",
                        event = "worker_panicked",
                        worker = plan.id,
                        error = %join,
                    );
                    WorkerReport::new(
                        *plan,
                        PassProgress::default(),
                        WorkerOutcome::Failed,
                        Some(format!("worker {} panicked: {join}", plan.id)),
                    )
                }
            };
            workers.push(report);
        }

        self.state = if workers
            .iter()
            .all(|worker| worker.outcome == WorkerOutcome::Completed)
        {
            RunState::Completed
        } else {
            RunState::Failed
        };
        let elapsed = start.elapsed();
        log_info!(
            component = "orchestrator",
            event = "run_finished",
            state = %self.state,
            elapsed_ms = elapsed.as_millis() as u64,
        );

        Ok(RunReport::new(
            &self.plan,
            store.backend_name(),
            keys.len(),
            self.state,
            elapsed,
            workers,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Orchestrator, RunError, RunState};
    use crate::{
        partition::ChunkSize,
        store::{MemoryStore, StatusStore},
        strategy::{ExecutionPlan, Strategy},
    };

    #[tokio::test(flavor = "multi_thread")]
    async fn batch_run_completes() {
        let plan = ExecutionPlan::for_strategy(Strategy::Batch, ChunkSize::new(3).unwrap(), 1);
        let mut orchestrator = Orchestrator::new(plan).with_seed(9);
        assert_eq!(orchestrator.state(), RunState::Idle);

        let keys: Arc<[u64]> = (0..7).collect();
        let store = Arc::new(MemoryStore::new());
        let report = orchestrator.run(keys, store.clone()).await.unwrap();

        assert_eq!(orchestrator.state(), RunState::Completed);
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.workers.len(), 1);
        assert_eq!(report.workers[0].chunks_written, 3);
        assert_eq!(store.len().unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_run_is_rejected() {
        let plan = ExecutionPlan::for_strategy(Strategy::Serial, ChunkSize::DEFAULT, 1);
        let mut orchestrator = Orchestrator::new(plan);
        let keys: Arc<[u64]> = Arc::from(vec![1u64, 2]);
        let store = Arc::new(MemoryStore::new());
        orchestrator.run(keys.clone(), store.clone()).await.unwrap();

        let err = orchestrator.run(keys, store).await.unwrap_err();
        assert!(matches!(err, RunError::AlreadyStarted(RunState::Completed)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn seeded_runs_are_reproducible() {
        let keys: Arc<[u64]> = (0..1_000).collect();
        let mut snapshots = Vec::new();
        for _ in 0..2 {
            let plan =
                ExecutionPlan::for_strategy(Strategy::Batch, ChunkSize::new(128).unwrap(), 1);
            let store = Arc::new(MemoryStore::new());
            Orchestrator::new(plan)
                .with_seed(1234)
                .run(keys.clone(), store.clone())
                .await
                .unwrap();
            snapshots.push(store.snapshot().unwrap());
        }
        assert_eq!(snapshots[0], snapshots[1]);
    }
}
