//! One worker's full pass over the key space.

use std::time::{Duration, Instant};

use crate::{
    key::Key,
    keyspace::shuffle,
    observability::{log_debug, log_info},
    partition::Partitioner,
    record::Record,
    status::StatusAssigner,
    store::StatusStore,
    strategy::{Traversal, WorkerPlan, WriteMode},
    writer::{BatchUpsertWriter, WriteError},
};

/// How far a pass got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassProgress {
    /// Storage calls that committed (chunks, or records in per-record mode).
    pub chunks: usize,
    /// Records that committed.
    pub records: usize,
    /// Wall time of the pass so far.
    pub elapsed: Duration,
}

/// A pass stopped on its first write failure.
#[derive(Debug, thiserror::Error)]
#[error("worker {worker} failed after {} committed chunks: {source}", progress.chunks)]
pub struct WorkerError {
    /// 1-based worker id.
    pub worker: usize,
    /// Work committed before the failure.
    pub progress: PassProgress,
    /// The failed write.
    #[source]
    pub source: WriteError,
}

/// Sequential partition-then-write pipeline run by a single worker.
pub struct WorkerPass<'s, S> {
    plan: WorkerPlan,
    mode: WriteMode,
    store: &'s S,
    rng: fastrand::Rng,
}

impl<'s, S> WorkerPass<'s, S>
where
    S: StatusStore,
{
    /// Pass for `plan` writing to `store`. `rng` drives both the shuffle and
    /// status assignment of this worker.
    pub fn new(plan: WorkerPlan, mode: WriteMode, store: &'s S, rng: fastrand::Rng) -> Self {
        Self {
            plan,
            mode,
            store,
            rng,
        }
    }

    /// Traverse `keys` once, in this worker's order, stopping at the first
    /// failed write.
    pub fn run<K: Key>(mut self, keys: &[K]) -> Result<PassProgress, WorkerError> {
        let start = Instant::now();
        let shuffled;
        let keys = match self.plan.traversal {
            Traversal::Source => keys,
            Traversal::Shuffled => {
                let mut owned = keys.to_vec();
                shuffle(&mut owned, &mut self.rng);
                log_info!(
                    component = "worker",
                    event = "keys_shuffled",
                    worker = self.plan.id,
                    keys = owned.len(),
                );
                shuffled = owned;
                &shuffled[..]
            }
        };

        let mut assigner = StatusAssigner::new(self.rng);
        let mut writer = BatchUpsertWriter::new(self.store);
        let mut progress = PassProgress::default();
        let worker = self.plan.id;
        let fail = |progress: PassProgress, source: WriteError| WorkerError {
            worker,
            progress: PassProgress {
                elapsed: start.elapsed(),
                ..progress
            },
            source,
        };

        match self.mode {
            WriteMode::PerRecord => {
                for key in keys {
                    let record = Record::new(key.clone(), assigner.assign(key));
                    writer
                        .write_record(&record)
                        .map_err(|source| fail(progress, source))?;
                    progress.chunks += 1;
                    progress.records += 1;
                }
            }
            WriteMode::PerChunk(chunk_size) => {
                let partitioner = Partitioner::new(chunk_size);
                for chunk in partitioner.chunks(keys) {
                    let records = assigner.assign_chunk(chunk);
                    let written = writer
                        .write_chunk(&records)
                        .map_err(|source| fail(progress, source))?;
                    progress.chunks += 1;
                    progress.records += written;
                    log_debug!(
                        component = "worker",
                        event = "chunk_written",
                        worker,
                        chunk = progress.chunks,
                        records = written,
                    );
                }
            }
        }

        progress.elapsed = start.elapsed();
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerPass;
    use crate::{
        key::Key,
        partition::ChunkSize,
        store::{MemoryStore, StatusStore},
        strategy::{Traversal, WorkerPlan, WriteMode},
    };

    fn plan(traversal: Traversal) -> WorkerPlan {
        WorkerPlan { id: 1, traversal }
    }

    #[test]
    fn chunked_pass_counts_chunks_and_records() {
        let store = MemoryStore::new();
        let keys: Vec<u64> = (0..7).collect();
        let mode = WriteMode::PerChunk(ChunkSize::new(3).unwrap());
        let progress = WorkerPass::new(
            plan(Traversal::Source),
            mode,
            &store,
            fastrand::Rng::with_seed(1),
        )
        .run(&keys)
        .unwrap();

        assert_eq!(progress.chunks, 3);
        assert_eq!(progress.records, 7);
        assert_eq!(store.len().unwrap(), 7);
    }

    #[test]
    fn per_record_pass_writes_every_key() {
        let store = MemoryStore::new();
        let keys: Vec<u64> = (100..110).collect();
        let progress = WorkerPass::new(
            plan(Traversal::Source),
            WriteMode::PerRecord,
            &store,
            fastrand::Rng::with_seed(2),
        )
        .run(&keys)
        .unwrap();

        assert_eq!(progress.chunks, 10);
        assert!(keys
            .iter()
            .all(|key| store.get(&key.encode()).unwrap().is_some()));
    }

    #[test]
    fn shuffled_pass_covers_the_same_keys() {
        let store = MemoryStore::new();
        let keys: Vec<u64> = (0..500).collect();
        let mode = WriteMode::PerChunk(ChunkSize::new(64).unwrap());
        WorkerPass::new(
            plan(Traversal::Shuffled),
            mode,
            &store,
            fastrand::Rng::with_seed(3),
        )
        .run(&keys)
        .unwrap();

        let stored: Vec<Vec<u8>> = store.snapshot().unwrap().into_keys().collect();
        let expected: Vec<Vec<u8>> = keys.iter().map(Key::encode).collect();
        assert_eq!(stored, expected);
    }

    #[test]
    fn empty_key_space_writes_nothing() {
        let store = MemoryStore::new();
        let progress = WorkerPass::new(
            plan(Traversal::Source),
            WriteMode::PerChunk(ChunkSize::DEFAULT),
            &store,
            fastrand::Rng::with_seed(4),
        )
        .run::<u64>(&[])
        .unwrap();
        assert_eq!(progress.chunks, 0);
        assert!(store.is_empty().unwrap());
    }
}
