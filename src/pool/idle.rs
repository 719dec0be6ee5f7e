//! Idle-thread marker.
//!
//! Workers wrap their condition-variable waits in an [`IdleThreadBlock`]
//! so tooling running on the same thread (hooks, task bodies) can tell
//! blocked-on-work apart from blocked-on-mutex.

use std::cell::Cell;

thread_local! {
    static IDLE: Cell<bool> = const { Cell::new(false) };
}

/// RAII marker: the current thread is parked waiting for work.
pub struct IdleThreadBlock(());

impl IdleThreadBlock {
    pub fn new() -> Self {
        IDLE.with(|idle| idle.set(true));
        Self(())
    }
}

impl Default for IdleThreadBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IdleThreadBlock {
    fn drop(&mut self) {
        IDLE.with(|idle| idle.set(false));
    }
}

/// True while the calling thread is inside an [`IdleThreadBlock`].
pub fn current_thread_is_idle() -> bool {
    IDLE.with(|idle| idle.get())
}
