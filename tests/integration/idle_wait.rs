//! wait_for_idle scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workpool::pool::{current_thread_is_idle, ThreadPool};

use crate::helpers::*;

/// wait_for_idle returns only after every task completed and every
/// worker is back to waiting for work.
#[test]
fn test_wait_for_idle_blocks_until_done() {
    let pool = Arc::new(ThreadPool::new(options(2, 4, Duration::from_secs(3600))));
    pool.startup();

    let completed = Arc::new(AtomicUsize::new(0));
    for _ in 0..8 {
        let completed = Arc::clone(&completed);
        pool.schedule(move |outcome| {
            assert!(outcome.is_ok());
            // A worker running a task is not inside its idle block.
            assert!(!current_thread_is_idle());
            thread::sleep(Duration::from_millis(20));
            completed.fetch_add(1, Ordering::SeqCst);
        });
    }

    let observer = {
        let pool = Arc::clone(&pool);
        let completed = Arc::clone(&completed);
        thread::spawn(move || {
            pool.wait_for_idle();
            completed.load(Ordering::SeqCst)
        })
    };

    let seen_at_wakeup = observer.join().unwrap();
    assert_eq!(seen_at_wakeup, 8);

    let stats = pool.get_stats();
    assert_eq!(stats.num_pending_tasks, 0);
    assert_eq!(stats.num_idle_threads, stats.num_threads);

    pool.shutdown();
    pool.join();
}

/// An idle pool does not block wait_for_idle at all.
#[test]
fn test_wait_for_idle_on_empty_pool() {
    let pool = ThreadPool::new(options(2, 4, Duration::from_secs(3600)));
    pool.startup();
    pool.wait_for_idle();

    pool.shutdown();
    pool.join();
}
