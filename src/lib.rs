//! workpool - Bounded, self-sizing worker pool.
//!
//! This crate provides a pool of background OS threads that executes
//! caller-submitted callbacks with bounded parallelism, FIFO dispatch,
//! and idle-thread reclamation.
//!
//! # Features
//!
//! - **Deferred startup**: tasks scheduled before `startup()` are held
//!   and covered by the initial worker spawn
//! - **Backlog growth**: the pool grows one worker at a time, up to its
//!   maximum, while demand outruns idle supply
//! - **Idle retirement**: workers above the minimum retire themselves
//!   after a configurable idle age and are reaped lazily
//! - **Exactly-once outcomes**: every accepted task is invoked once,
//!   with `Ok` or `ShutdownInProgress`
//! - **Async bridge**: `execute()` awaits a task's return value from
//!   async code via a oneshot channel
//! - **Structured logging**: single-line JSON logging with tracing
//!
//! # Example
//!
//! ```rust,ignore
//! use workpool::{Options, ThreadPool};
//!
//! let pool = ThreadPool::new(Options::default());
//! pool.startup();
//! pool.schedule(|outcome| {
//!     if outcome.is_ok() {
//!         println!("running on a pool thread");
//!     }
//! });
//! pool.shutdown();
//! pool.join();
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod logging;
pub mod pool;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use pool::{Options, PoolError, PoolResult, Stats, ThreadPool};
pub use types::{Task, TaskOutcome};
