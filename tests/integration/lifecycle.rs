//! Startup, shutdown, and join lifecycle scenarios.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workpool::pool::ThreadPool;
use workpool::types::TaskOutcome;

use crate::helpers::*;

/// Tasks scheduled before startup are deferred, not dropped; startup
/// spawns enough workers to cover them.
#[test]
fn test_submit_before_start() {
    let pool = ThreadPool::new(options(0, 4, Duration::from_secs(1)));
    let counter = OutcomeCounter::new();
    for _ in 0..2 {
        let counter = Arc::clone(&counter);
        pool.schedule(move |outcome| counter.record(outcome));
    }
    assert_eq!(pool.get_stats().num_threads, 0);
    assert_eq!(pool.get_stats().num_pending_tasks, 2);

    pool.startup();
    assert!(pool.get_stats().num_threads >= 2);

    assert!(wait_until(Duration::from_secs(5), || counter.ok() == 2));
    pool.shutdown();
    pool.join();
    assert_eq!(counter.ok(), 2);
    assert_eq!(counter.shutdown(), 0);
}

/// Startup covers a backlog larger than the maximum by spawning exactly
/// max_threads workers.
#[test]
fn test_startup_caps_backlog_coverage() {
    let pool = ThreadPool::new(options(0, 4, Duration::from_secs(3600)));
    let counter = OutcomeCounter::new();
    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        pool.schedule(move |outcome| counter.record(outcome));
    }
    pool.startup();
    assert_eq!(pool.get_stats().num_threads, 4);

    pool.shutdown();
    pool.join();
    assert_eq!(counter.ok(), 10);
}

/// Dropping a started pool shuts it down and drains pending work.
#[test]
fn test_drop_drains_pending_work() {
    let counter = OutcomeCounter::new();
    {
        let pool = ThreadPool::new(options(1, 2, Duration::from_secs(3600)));
        pool.startup();
        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.schedule(move |outcome| counter.record(outcome));
        }
    }
    assert_eq!(counter.total(), 5);
    assert_eq!(counter.shutdown(), 0);
}

/// After join completes, submissions are rejected synchronously on the
/// submitting thread.
#[test]
fn test_schedule_after_join_runs_inline() {
    let pool = ThreadPool::new(options(1, 2, Duration::from_secs(3600)));
    pool.startup();
    pool.shutdown();
    pool.join();
    assert_eq!(pool.get_stats().num_threads, 0);
    assert_eq!(pool.get_stats().num_pending_tasks, 0);

    let submitter = thread::current().id();
    let saw = Arc::new(std::sync::Mutex::new(None));
    let saw_clone = Arc::clone(&saw);
    pool.schedule(move |outcome| {
        *saw_clone.lock().unwrap() = Some((outcome, thread::current().id()));
    });

    // Rejection happens before schedule returns.
    let observed = saw.lock().unwrap().expect("task was not invoked");
    assert_eq!(observed.0, TaskOutcome::ShutdownInProgress);
    assert_eq!(observed.1, submitter);
}

/// Startup after a pre-start shutdown is not required for join to
/// complete; the pool can die without ever running.
#[test]
fn test_shutdown_before_startup() {
    let pool = ThreadPool::new(options(2, 4, Duration::from_secs(3600)));
    pool.shutdown();
    pool.join();
    assert_eq!(pool.get_stats().num_threads, 0);
}
