#![deny(missing_docs)]
//! Strategies for writing a large key space of status records into storage.
//!
//! A run enumerates an ordered key space, splits it into bounded chunks and
//! upserts each chunk as one atomic storage transaction. The [`Orchestrator`]
//! fans this pipeline out to one or more workers according to a [`Strategy`]:
//! per-record writes, single-worker batches, or several concurrent workers
//! that each traverse the whole key space, optionally in shuffled order, and
//! race on the same keys.
//!
//! Storage is reached only through [`store::StatusStore`], so the same
//! pipeline runs against the in-memory store, redb, or sled.

mod observability;

/// Storage key encoding.
pub mod key;

/// Key-space enumeration and shuffling.
pub mod keyspace;

/// Status values and random assignment.
pub mod status;

/// The (key, status) pair written to storage.
pub mod record;

pub mod partition;

pub mod store;

pub mod writer;

pub mod strategy;

pub mod worker;

pub mod orchestrator;

pub mod report;

/// Post-run read-back.
pub mod verify;

pub mod config;

pub use crate::{
    config::RunConfig,
    key::Key,
    orchestrator::{Orchestrator, RunError, RunState},
    partition::{ChunkSize, Partitioner},
    record::Record,
    report::RunReport,
    status::{Status, StatusAssigner},
    strategy::{ExecutionPlan, Strategy},
    writer::BatchUpsertWriter,
};
