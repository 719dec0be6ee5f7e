//! Worker pool core: state machine, dispatcher, worker body, and the
//! join/drain protocol.
//!
//! One mutex guards every mutable field; task bodies and thread joins
//! run with the lock released. Three condition variables share that
//! mutex: `work_available` wakes workers, `state_change` broadcasts
//! lifecycle transitions, and `pool_is_idle` wakes `wait_for_idle`
//! observers.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use super::error::{PoolError, PoolResult};
use super::idle::IdleThreadBlock;
use super::options::Options;
use super::{events, fatal, Stats};
use crate::types::{Task, TaskOutcome};

/// Lifecycle phase of the pool. Only ever advances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LifecycleState {
    PreStart,
    Running,
    JoinRequired,
    Joining,
    ShutdownComplete,
}

/// Mutable pool state, guarded by the single pool mutex.
struct Core {
    state: LifecycleState,
    pending_tasks: VecDeque<Task>,
    /// Live workers, joinable by `join()`.
    threads: Vec<JoinHandle<()>>,
    /// Workers that exited their loop but whose handles have not been
    /// joined yet.
    retired_threads: VecDeque<JoinHandle<()>>,
    /// Live workers not currently holding a task in flight. Newly
    /// spawned workers count as idle until their first task.
    num_idle_threads: usize,
    /// Most recent instant at which demand met or exceeded supply; the
    /// retirement clock runs from this anchor.
    last_full_utilization: Instant,
    /// Monotonic id used to name workers and the drain thread.
    next_thread_id: u64,
}

struct Inner {
    options: Options,
    core: Mutex<Core>,
    /// Wakes workers when the queue may be non-empty.
    work_available: Condvar,
    /// Broadcasts every lifecycle transition.
    state_change: Condvar,
    /// Wakes `wait_for_idle` observers.
    pool_is_idle: Condvar,
}

/// A bounded, self-sizing pool of worker threads.
///
/// Workers pull tasks from a shared FIFO queue. The pool grows one
/// worker at a time while backlog outruns idle supply, up to
/// `max_threads`, and workers above `min_threads` retire themselves
/// after `max_idle_thread_age` of pool-wide idleness.
pub struct ThreadPool {
    inner: Arc<Inner>,
}

impl ThreadPool {
    /// Create a pool in the pre-start state.
    ///
    /// Tasks may be scheduled immediately; they are held until
    /// [`startup`](Self::startup) spawns workers to cover them.
    /// Illegal bounds in `options` abort the process.
    pub fn new(options: Options) -> Self {
        let options = options.normalize();
        Self {
            inner: Arc::new(Inner {
                options,
                core: Mutex::new(Core {
                    state: LifecycleState::PreStart,
                    pending_tasks: VecDeque::new(),
                    threads: Vec::new(),
                    retired_threads: VecDeque::new(),
                    num_idle_threads: 0,
                    last_full_utilization: Instant::now(),
                    next_thread_id: 0,
                }),
                work_available: Condvar::new(),
                state_change: Condvar::new(),
                pool_is_idle: Condvar::new(),
            }),
        }
    }

    /// Move the pool from pre-start to running and spawn enough workers
    /// to cover `min_threads` and any backlog, capped at `max_threads`.
    ///
    /// Calling this twice is a programmer error and aborts.
    pub fn startup(&self) {
        let mut core = self.inner.lock();
        if core.state != LifecycleState::PreStart {
            fatal!(
                events::DOUBLE_START,
                pool = %self.inner.options.pool_name,
                "attempted to start a pool that has already started"
            );
        }
        self.inner.set_state(&mut core, LifecycleState::Running);
        debug_assert!(core.threads.is_empty());
        let num_to_start = self
            .inner
            .options
            .max_threads
            .min(self.inner.options.min_threads.max(core.pending_tasks.len()));
        for _ in 0..num_to_start {
            Inner::spawn_worker(&self.inner, &mut core);
        }
        tracing::info!(
            pool = %self.inner.options.pool_name,
            workers = core.threads.len(),
            min_threads = self.inner.options.min_threads,
            max_threads = self.inner.options.max_threads,
            "thread pool started"
        );
    }

    /// Begin shutdown: all future submissions are rejected inline and
    /// idle workers are woken so they can drain and exit.
    ///
    /// Idempotent after the first call; never blocks.
    pub fn shutdown(&self) {
        let mut core = self.inner.lock();
        self.inner.shutdown_inlock(&mut core);
    }

    /// Block until every enqueued task has run and every worker thread
    /// has been joined.
    ///
    /// Waits for [`shutdown`](Self::shutdown) if it has not happened
    /// yet. Joining a pool more than once is a programmer error and
    /// aborts.
    pub fn join(&self) {
        let core = self.inner.lock();
        drop(Inner::join_inlock(&self.inner, core));
    }

    /// Hand `task` to the pool.
    ///
    /// Never blocks beyond mutex contention. If the pool is shutting
    /// down the task is invoked here, on the submitting thread, with
    /// [`TaskOutcome::ShutdownInProgress`]; otherwise it is enqueued
    /// and will eventually be invoked with [`TaskOutcome::Ok`].
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce(TaskOutcome) + Send + 'static,
    {
        let inner = &self.inner;
        let mut core = inner.lock();
        match core.state {
            LifecycleState::JoinRequired
            | LifecycleState::Joining
            | LifecycleState::ShutdownComplete => {
                drop(core);
                tracing::debug!(
                    pool = %inner.options.pool_name,
                    "rejecting task scheduled during shutdown"
                );
                task(TaskOutcome::ShutdownInProgress);
                return;
            }
            LifecycleState::PreStart | LifecycleState::Running => {}
        }
        core.pending_tasks.push_back(Box::new(task));
        if core.state == LifecycleState::PreStart {
            // Workers are sized by startup(); nothing to wake yet.
            return;
        }
        if core.num_idle_threads < core.pending_tasks.len() {
            Inner::spawn_worker(inner, &mut core);
        }
        if core.num_idle_threads <= core.pending_tasks.len() {
            // Demand met or exceeded supply; reset the retirement clock.
            core.last_full_utilization = Instant::now();
        }
        inner.work_available.notify_one();
    }

    /// Block until the queue is empty and every live worker is waiting
    /// for work.
    pub fn wait_for_idle(&self) {
        let mut core = self.inner.lock();
        while !core.pending_tasks.is_empty() || core.num_idle_threads < core.threads.len() {
            core = self.inner.pool_is_idle.wait(core).unwrap();
        }
    }

    /// Snapshot the observable counters under the pool mutex.
    pub fn get_stats(&self) -> Stats {
        let core = self.inner.lock();
        Stats {
            options: self.inner.options.clone(),
            num_threads: core.threads.len(),
            num_idle_threads: core.num_idle_threads,
            num_pending_tasks: core.pending_tasks.len(),
            last_full_utilization: core.last_full_utilization,
        }
    }
}

// =============================================================================
// Async submission facade
// =============================================================================

impl ThreadPool {
    /// Schedule `work` and receive its return value on a oneshot
    /// channel.
    ///
    /// If the pool is shutting down the receiver resolves immediately
    /// to [`PoolError::Shutdown`] without running `work`.
    pub fn submit<F, R>(&self, work: F) -> oneshot::Receiver<PoolResult<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (response_tx, response_rx) = oneshot::channel();
        self.schedule(move |outcome| {
            let result = match outcome {
                TaskOutcome::Ok => Ok(work()),
                TaskOutcome::ShutdownInProgress => Err(PoolError::Shutdown),
            };
            // The caller may have stopped waiting; that is its business.
            let _ = response_tx.send(result);
        });
        response_rx
    }

    /// Execute `work` on the pool and await its return value.
    pub async fn execute<F, R>(&self, work: F) -> PoolResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.submit(work).await {
            Ok(result) => result,
            Err(_) => Err(PoolError::ChannelClosed),
        }
    }

    /// Execute `work` with a deadline on the whole round trip.
    ///
    /// On timeout the work itself still runs; only its result is
    /// discarded.
    pub async fn execute_with_timeout<F, R>(&self, work: F, timeout: Duration) -> PoolResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match tokio::time::timeout(timeout, self.submit(work)).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PoolError::ChannelClosed),
            Err(_) => Err(PoolError::Timeout(timeout)),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        let inner = &self.inner;
        let mut core = inner.lock();
        inner.shutdown_inlock(&mut core);
        if core.state != LifecycleState::ShutdownComplete {
            core = Inner::join_inlock(inner, core);
        }
        if core.state != LifecycleState::ShutdownComplete {
            fatal!(
                events::DESTROY_INCOMPLETE,
                pool = %inner.options.pool_name,
                "failed to shut down pool during destruction"
            );
        }
        debug_assert!(core.threads.is_empty());
        debug_assert!(core.pending_tasks.is_empty());
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap()
    }

    /// Advance the lifecycle state and broadcast the transition.
    fn set_state(&self, core: &mut Core, new_state: LifecycleState) {
        if core.state == new_state {
            return;
        }
        core.state = new_state;
        self.state_change.notify_all();
    }

    fn shutdown_inlock(&self, core: &mut Core) {
        match core.state {
            LifecycleState::PreStart | LifecycleState::Running => {
                self.set_state(core, LifecycleState::JoinRequired);
                self.work_available.notify_all();
            }
            LifecycleState::JoinRequired
            | LifecycleState::Joining
            | LifecycleState::ShutdownComplete => {}
        }
    }

    /// The join protocol: wait for shutdown, drain residual tasks on a
    /// transient thread, reap retired workers, join live workers, and
    /// broadcast shutdown-complete.
    fn join_inlock<'a>(
        inner: &'a Arc<Inner>,
        mut core: MutexGuard<'a, Core>,
    ) -> MutexGuard<'a, Core> {
        loop {
            match core.state {
                LifecycleState::PreStart | LifecycleState::Running => {
                    core = inner.state_change.wait(core).unwrap();
                }
                LifecycleState::JoinRequired => break,
                LifecycleState::Joining | LifecycleState::ShutdownComplete => {
                    fatal!(
                        events::DOUBLE_JOIN,
                        pool = %inner.options.pool_name,
                        "attempted to join pool more than once"
                    );
                }
            }
        }
        inner.set_state(&mut core, LifecycleState::Joining);

        // The drain thread's task accounting borrows an idle slot;
        // pre-pay it so do_one_task's decrement cannot underflow.
        core.num_idle_threads += 1;
        if !core.pending_tasks.is_empty() {
            let thread_name = format!(
                "{}{}",
                inner.options.thread_name_prefix, core.next_thread_id
            );
            core.next_thread_id += 1;
            drop(core);
            Inner::drain_pending_tasks(inner, thread_name);
            core = inner.lock();
        }
        core.num_idle_threads -= 1;

        inner.join_retired_inlock(&mut core);
        let threads_to_join = std::mem::take(&mut core.threads);
        drop(core);
        for handle in threads_to_join {
            let _ = handle.join();
        }
        core = inner.lock();
        debug_assert_eq!(core.state, LifecycleState::Joining);
        inner.set_state(&mut core, LifecycleState::ShutdownComplete);
        core
    }

    /// Execute every residual pending task on a transient pool-named
    /// thread. Tasks must not run on the joining caller's thread, which
    /// may be bound to execution context tasks are not allowed to
    /// observe.
    fn drain_pending_tasks(inner: &Arc<Inner>, thread_name: String) {
        let drain_inner = Arc::clone(inner);
        let builder = thread::Builder::new().name(thread_name.clone());
        let spawned = builder.spawn(move || {
            (drain_inner.options.on_create_thread)(&thread_name);
            tracing::debug!(
                pool = %drain_inner.options.pool_name,
                thread = %thread_name,
                "draining residual tasks"
            );
            let mut core = drain_inner.lock();
            while !core.pending_tasks.is_empty() {
                core = drain_inner.do_one_task(core);
            }
        });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                fatal!(
                    events::DRAIN_SPAWN_FAILED,
                    pool = %inner.options.pool_name,
                    error = %err,
                    "failed to start drain thread during join"
                );
            }
        };
        let _ = handle.join();
    }

    /// Join every retired worker and run the reap hook for each.
    fn join_retired_inlock(&self, core: &mut Core) {
        while let Some(handle) = core.retired_threads.pop_front() {
            let os_thread = handle.thread().clone();
            let _ = handle.join();
            (self.options.on_join_retired_thread)(&os_thread);
        }
    }

    /// The per-worker consume loop. Entered with no lock held; holds
    /// the pool mutex except across task invocations.
    fn consume_tasks(&self) {
        let mut core = self.lock();
        while core.state == LifecycleState::Running {
            if core.pending_tasks.is_empty() {
                // Housekeeping: reap retired handles so the retired
                // list stays short and join() has less to do.
                self.join_retired_inlock(&mut core);

                if core.threads.len() > self.options.min_threads {
                    // More threads than the minimum, so this one may be
                    // eligible for retirement. Bound the wait by the
                    // next retirement deadline.
                    let now = Instant::now();
                    let retirement_deadline =
                        core.last_full_utilization + self.options.max_idle_thread_age;
                    if now >= retirement_deadline {
                        core.last_full_utilization = now;
                        tracing::debug!(
                            pool = %self.options.pool_name,
                            next_reap_in = ?self.options.max_idle_thread_age,
                            "reaping this thread"
                        );
                        break;
                    }
                    tracing::trace!(
                        pool = %self.options.pool_name,
                        remaining = ?(retirement_deadline - now),
                        "not reaping; retirement deadline not reached"
                    );
                    core = {
                        let _idle = IdleThreadBlock::new();
                        self.work_available
                            .wait_timeout(core, retirement_deadline - now)
                            .unwrap()
                            .0
                    };
                } else {
                    // At or below the minimum; never retired, so an
                    // unbounded wait is fine. Threads above the minimum
                    // become eligible on their own once they go idle.
                    tracing::trace!(
                        pool = %self.options.pool_name,
                        live_threads = core.threads.len(),
                        min_threads = self.options.min_threads,
                        "waiting for work"
                    );
                    core = {
                        let _idle = IdleThreadBlock::new();
                        self.work_available.wait(core).unwrap()
                    };
                }
                continue;
            }

            core = self.do_one_task(core);
        }

        // Still holding the lock. If the whole pool is shutting down,
        // lend a hand draining the queue and return so the joiner can
        // reap this thread. Otherwise this is an idle retirement.
        match core.state {
            LifecycleState::JoinRequired | LifecycleState::Joining => {
                while !core.pending_tasks.is_empty() {
                    core = self.do_one_task(core);
                }
                core.num_idle_threads -= 1;
                return;
            }
            LifecycleState::Running => {}
            LifecycleState::PreStart | LifecycleState::ShutdownComplete => {
                fatal!(
                    events::WORKER_BAD_STATE,
                    pool = %self.options.pool_name,
                    state = ?core.state,
                    "worker observed a lifecycle state it can never run in"
                );
            }
        }
        core.num_idle_threads -= 1;

        // Retiring: move our own handle from the live list to the
        // retired list so a future worker or the joiner can reap it.
        // A worker must never join its own thread.
        let my_id = thread::current().id();
        match core
            .threads
            .iter()
            .position(|handle| handle.thread().id() == my_id)
        {
            Some(index) => {
                let handle = core.threads.swap_remove(index);
                core.retired_threads.push_back(handle);
            }
            None => {
                fatal!(
                    events::RETIREE_NOT_FOUND,
                    pool = %self.options.pool_name,
                    thread = ?my_id,
                    "retiring worker could not find itself in the live thread list"
                );
            }
        }
    }

    /// Pop the queue head and run it with the lock released.
    fn do_one_task<'a>(&'a self, mut core: MutexGuard<'a, Core>) -> MutexGuard<'a, Core> {
        tracing::trace!(pool = %self.options.pool_name, "executing a task");
        let task = core
            .pending_tasks
            .pop_front()
            .expect("task queue unexpectedly empty");
        core.num_idle_threads -= 1;
        drop(core);
        task(TaskOutcome::Ok);
        let mut core = self.lock();
        core.num_idle_threads += 1;
        if core.pending_tasks.is_empty() && core.threads.len() == core.num_idle_threads {
            self.pool_is_idle.notify_all();
        }
        core
    }

    /// Spawn one worker, best-effort.
    ///
    /// Refusals (pre-start, shutting down, at maximum) and OS spawn
    /// failures are not errors; the queue still drains via surviving
    /// workers or the join drain.
    fn spawn_worker(inner: &Arc<Inner>, core: &mut Core) {
        match core.state {
            LifecycleState::PreStart => {
                tracing::debug!(
                    pool = %inner.options.pool_name,
                    "not starting new thread yet; waiting for startup"
                );
                return;
            }
            LifecycleState::JoinRequired
            | LifecycleState::Joining
            | LifecycleState::ShutdownComplete => {
                tracing::debug!(
                    pool = %inner.options.pool_name,
                    "not starting new thread while shutting down"
                );
                return;
            }
            LifecycleState::Running => {}
        }
        if core.threads.len() == inner.options.max_threads {
            tracing::debug!(
                pool = %inner.options.pool_name,
                max_threads = inner.options.max_threads,
                "not starting new thread; pool is at its maximum"
            );
            return;
        }
        debug_assert!(core.threads.len() < inner.options.max_threads);
        let thread_name = format!(
            "{}{}",
            inner.options.thread_name_prefix, core.next_thread_id
        );
        core.next_thread_id += 1;
        let worker_inner = Arc::clone(inner);
        let worker_name = thread_name.clone();
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker_body(worker_inner, worker_name));
        match spawned {
            Ok(handle) => {
                core.threads.push(handle);
                core.num_idle_threads += 1;
            }
            Err(err) => {
                tracing::error!(
                    pool = %inner.options.pool_name,
                    thread = %thread_name,
                    live_threads = core.threads.len(),
                    error = %err,
                    "failed to start worker thread"
                );
            }
        }
    }
}

/// Entry point of every worker thread.
fn worker_body(inner: Arc<Inner>, thread_name: String) {
    (inner.options.on_create_thread)(&thread_name);
    tracing::debug!(
        pool = %inner.options.pool_name,
        thread = %thread_name,
        "starting worker thread"
    );
    inner.consume_tasks();
    tracing::debug!(
        pool = %inner.options.pool_name,
        thread = %thread_name,
        "shutting down worker thread"
    );
}
