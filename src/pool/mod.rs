//! Worker pool: lifecycle, dispatch, and idle-thread reclamation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ThreadPool                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  schedule() ──► pending_tasks (FIFO) ──┬──► Worker 0         │
//! │                                        ├──► Worker 1         │
//! │                                        └──► Worker N  ...    │
//! │                                                              │
//! │  pre-start ─► running ─► join-required ─► joining ─► done    │
//! │                                                              │
//! │  Workers above min_threads retire after max_idle_thread_age  │
//! │  of pool-wide idleness; retired handles are reaped by the    │
//! │  next idle worker or by join().                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tasks are dequeued in FIFO submission order and executed outside the
//! pool mutex. Once `shutdown()` is called, new submissions are invoked
//! inline with [`TaskOutcome::ShutdownInProgress`](crate::types::TaskOutcome)
//! and everything already enqueued is drained with `Ok` before `join()`
//! returns.

mod error;
mod idle;
mod options;
mod thread;

pub use error::{PoolError, PoolResult};
pub use idle::current_thread_is_idle;
pub use options::{Options, RetiredThreadFn, ThreadStartFn};
pub use thread::ThreadPool;

use std::time::Instant;

/// Stable event ids attached to fatal log records.
///
/// Fatal conditions indicate corruption that cannot be recovered; the
/// pool logs a structured error carrying one of these ids and aborts.
pub(crate) mod events {
    /// `max_threads` below 1 at construction.
    pub const MAX_THREADS_TOO_SMALL: u32 = 4201;
    /// `min_threads` above `max_threads` at construction.
    pub const MIN_EXCEEDS_MAX: u32 = 4202;
    /// `startup()` called when the pool was not in pre-start.
    pub const DOUBLE_START: u32 = 4203;
    /// `join()` called after a join already began or completed.
    pub const DOUBLE_JOIN: u32 = 4204;
    /// A retiring worker could not find its own handle in the live list.
    pub const RETIREE_NOT_FOUND: u32 = 4205;
    /// A worker observed a lifecycle state it can never run in.
    pub const WORKER_BAD_STATE: u32 = 4206;
    /// Destruction finished without reaching shutdown-complete.
    pub const DESTROY_INCOMPLETE: u32 = 4207;
    /// The transient drain thread could not be spawned during join.
    pub const DRAIN_SPAWN_FAILED: u32 = 4208;
}

/// Log a structured error carrying a stable event id, then abort.
///
/// Reserved for invariant violations; operational conditions are logged
/// and reported through normal return paths instead.
macro_rules! fatal {
    ($event:expr, $($field:tt)+) => {{
        tracing::error!(event = $event, $($field)+);
        std::process::abort();
    }};
}
pub(crate) use fatal;

/// Point-in-time snapshot of pool state, taken under the pool mutex.
#[derive(Clone, Debug)]
pub struct Stats {
    /// The options the pool was constructed with, post-normalization.
    pub options: Options,
    /// Number of live worker threads.
    pub num_threads: usize,
    /// Number of live workers currently waiting for work.
    pub num_idle_threads: usize,
    /// Number of tasks queued but not yet dequeued.
    pub num_pending_tasks: usize,
    /// Most recent instant at which demand met or exceeded supply; the
    /// retirement clock runs from this anchor.
    pub last_full_utilization: Instant,
}
