//! Shutdown, drain, and rejection scenarios.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use workpool::pool::ThreadPool;
use workpool::types::TaskOutcome;

use crate::helpers::*;

/// Residual tasks at join time are drained to completion in submission
/// order, not dropped.
#[test]
fn test_drain_preserves_fifo() {
    let pool = ThreadPool::new(options(0, 1, Duration::from_secs(3600)));
    pool.startup();

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..10 {
        let order = Arc::clone(&order);
        pool.schedule(move |outcome| {
            assert!(outcome.is_ok());
            order.lock().unwrap().push(i);
        });
    }
    pool.shutdown();
    pool.join();

    assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

/// Repeated shutdown calls collapse into one; join still completes and
/// the pool ends fully reaped.
#[test]
fn test_shutdown_is_idempotent() {
    let pool = ThreadPool::new(options(1, 4, Duration::from_secs(3600)));
    pool.startup();

    let counter = OutcomeCounter::new();
    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        pool.schedule(move |outcome| counter.record(outcome));
    }

    pool.shutdown();
    pool.shutdown();
    pool.shutdown();
    pool.join();

    assert_eq!(counter.ok(), 10);
    let stats = pool.get_stats();
    assert_eq!(stats.num_threads, 0);
    assert_eq!(stats.num_pending_tasks, 0);
}

/// Shutdown racing a second submitter: every task sees exactly one
/// outcome, accepted outcomes form a prefix of the submitter's order,
/// and rejected tasks run on the submitting thread.
#[test]
fn test_shutdown_races_submission() {
    let pool = Arc::new(ThreadPool::new(options(2, 4, Duration::from_secs(3600))));
    pool.startup();

    // First submitter: 100 tasks enqueued before shutdown begins.
    let counter = OutcomeCounter::new();
    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        pool.schedule(move |outcome| counter.record(outcome));
    }

    // Second submitter races the shutdown below.
    let outcomes: Arc<Mutex<Vec<Option<(TaskOutcome, thread::ThreadId)>>>> =
        Arc::new(Mutex::new(vec![None; 100]));
    let racer = {
        let pool = Arc::clone(&pool);
        let outcomes = Arc::clone(&outcomes);
        thread::spawn(move || {
            let me = thread::current().id();
            for i in 0..100 {
                let outcomes = Arc::clone(&outcomes);
                pool.schedule(move |outcome| {
                    let slot = &mut outcomes.lock().unwrap()[i];
                    assert!(slot.is_none(), "task invoked twice");
                    *slot = Some((outcome, thread::current().id()));
                });
            }
            me
        })
    };

    pool.shutdown();
    pool.join();
    let racer_id = racer.join().unwrap();

    // Everything submitted before shutdown was accepted and ran.
    assert_eq!(counter.ok(), 100);
    assert_eq!(counter.shutdown(), 0);

    let outcomes = outcomes.lock().unwrap();
    assert!(outcomes.iter().all(|slot| slot.is_some()));

    // Accepted racer tasks form a prefix; every rejection ran inline on
    // the racer's own thread.
    let first_rejected = outcomes
        .iter()
        .position(|slot| slot.unwrap().0.is_shutdown())
        .unwrap_or(outcomes.len());
    for (i, slot) in outcomes.iter().enumerate() {
        let (outcome, ran_on) = slot.unwrap();
        if i < first_rejected {
            assert!(outcome.is_ok());
        } else {
            assert!(outcome.is_shutdown());
            assert_eq!(ran_on, racer_id);
        }
    }
}

/// Once shutdown is requested, submissions are rejected inline even
/// before anyone calls join.
#[test]
fn test_schedule_between_shutdown_and_join() {
    let pool = ThreadPool::new(options(1, 2, Duration::from_secs(3600)));
    pool.startup();
    pool.shutdown();

    let counter = OutcomeCounter::new();
    let c = Arc::clone(&counter);
    pool.schedule(move |outcome| c.record(outcome));
    assert_eq!(counter.shutdown(), 1);

    pool.join();
    assert_eq!(counter.total(), 1);
}
