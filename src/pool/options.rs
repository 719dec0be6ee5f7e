//! Pool construction options.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{events, fatal};

// Counter used to assign unique names to otherwise-unnamed pools.
static NEXT_UNNAMED_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Callback invoked by each worker (and the drain thread) after the OS
/// thread has adopted its name, before it does any pool work.
pub type ThreadStartFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback invoked under the pool mutex, once per retired worker,
/// right after its OS thread has been joined.
pub type RetiredThreadFn = Arc<dyn Fn(&std::thread::Thread) + Send + Sync>;

/// Construction parameters for a [`ThreadPool`](super::ThreadPool).
///
/// Immutable after construction and freely cloneable; the pool
/// normalizes names and checks the thread bounds once, in
/// [`ThreadPool::new`](super::ThreadPool::new).
#[derive(Clone)]
pub struct Options {
    /// Human-readable pool identifier. Empty means "assign a default of
    /// the form `ThreadPool{N}` from a process-wide counter".
    pub pool_name: String,
    /// Prefix for each worker's thread name. Empty means
    /// `"{pool_name}-"`.
    pub thread_name_prefix: String,
    /// Workers that are never retired by idleness.
    pub min_threads: usize,
    /// Hard upper bound on simultaneously live workers. Must be at
    /// least 1 and at least `min_threads`.
    pub max_threads: usize,
    /// How long a worker above `min_threads` may remain idle before it
    /// retires itself.
    pub max_idle_thread_age: Duration,
    /// Per-thread startup hook.
    pub on_create_thread: ThreadStartFn,
    /// Retired-worker reap hook.
    pub on_join_retired_thread: RetiredThreadFn,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            pool_name: String::new(),
            thread_name_prefix: String::new(),
            min_threads: 1,
            max_threads: 8,
            max_idle_thread_age: Duration::from_secs(30),
            on_create_thread: Arc::new(|_| {}),
            on_join_retired_thread: Arc::new(|_| {}),
        }
    }
}

impl Options {
    /// Fill in default names and enforce the thread bounds.
    ///
    /// Bound violations are programmer errors and abort the process.
    pub(crate) fn normalize(mut self) -> Self {
        if self.pool_name.is_empty() {
            let id = NEXT_UNNAMED_POOL_ID.fetch_add(1, Ordering::Relaxed);
            self.pool_name = format!("ThreadPool{id}");
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = format!("{}-", self.pool_name);
        }
        if self.max_threads < 1 {
            fatal!(
                events::MAX_THREADS_TOO_SMALL,
                pool = %self.pool_name,
                max_threads = self.max_threads,
                "pool maximum must be at least 1"
            );
        }
        if self.min_threads > self.max_threads {
            fatal!(
                events::MIN_EXCEEDS_MAX,
                pool = %self.pool_name,
                min_threads = self.min_threads,
                max_threads = self.max_threads,
                "pool minimum exceeds the configured maximum"
            );
        }
        self
    }
}

impl fmt::Debug for Options {
    // The callbacks are opaque; show the plain fields only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("pool_name", &self.pool_name)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("min_threads", &self.min_threads)
            .field("max_threads", &self.max_threads)
            .field("max_idle_thread_age", &self.max_idle_thread_age)
            .finish_non_exhaustive()
    }
}
