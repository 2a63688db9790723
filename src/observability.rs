//! `tracing` macros pinned to the `scanstore` target.
//!
//! Filter with `RUST_LOG=scanstore=debug` to see per-chunk commits; `info`
//! shows one line per run and per worker. Only the binary installs a
//! subscriber.
//!
//! Every event has a `component` (`orchestrator`, `worker` or `writer`) and
//! a snake_case `event`:
//!
//! | event | level | fields |
//! |-------|-------|--------|
//! | `run_started` | info | `strategy`, `backend`, `workers`, `keys`, `chunk_size` |
//! | `worker_started` | info | `worker`, `of`, `traversal`, `keys` |
//! | `keys_shuffled` | info | `worker`, `keys` |
//! | `chunk_written` | debug | `worker`, `chunk`, `records` |
//! | `chunk_committed` | debug | `backend`, `records` |
//! | `rollback_failed` | warn | `backend`, `error` |
//! | `worker_completed` | info | `worker`, `chunks`, `records`, `elapsed_ms` |
//! | `worker_failed` | error | `worker`, `records`, `error` |
//! | `worker_panicked` | warn | `worker`, `error` |
//! | `run_finished` | info | `state`, `elapsed_ms` |
//!
//! `worker` is the 0-based id from the execution plan. Individual records
//! are never logged.

/// Target of every event emitted by the library.
pub(crate) const SCANSTORE_TARGET: &str = "scanstore";

/// Info-level event.
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::SCANSTORE_TARGET, $($field)*)
    };
}

/// Debug-level event.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::SCANSTORE_TARGET, $($field)*)
    };
}

/// Warn-level event.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::SCANSTORE_TARGET, $($field)*)
    };
}

/// Error-level event.
macro_rules! log_error {
    ($($field:tt)*) => {
        ::tracing::error!(target: $crate::observability::SCANSTORE_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
