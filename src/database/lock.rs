// File: src/database/lock.rs

//! Writer coordination
//!
//! One privileged long-lived writer shares the database file with a pool of
//! short-lived connections. SQLite serializes them at the file level, but
//! left alone the long-lived writer and a burst of short-lived writers would
//! ping-pong on busy errors. The coordinator keeps two cells, the count of
//! active short-lived read-write sections and a flag for the long-lived
//! writer, and guarantees that at any instant either the long-lived writer
//! runs alone or only short-lived writers do.
//!
//! Read-only sections never touch the coordinator.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LockState {
    short_lived: usize,
    long_lived_active: bool,
}

/// The two coordination cells plus the condition their waiters block on.
///
/// Shared via `Arc` between the long-lived bracket and every short-lived
/// bracket opened against the same file.
#[derive(Debug, Default)]
pub struct ConnectionLock {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl ConnectionLock {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned mutex only means another section panicked mid-update; the
    // counters themselves are updated atomically under the guard, so the
    // state is still consistent and waiting must go on.
    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter a short-lived read-write section: wait for the long-lived
    /// writer to go idle, then register.
    pub(crate) fn short_lived_section(&self) -> ShortLivedGuard<'_> {
        let mut state = self.state();
        while state.long_lived_active {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.short_lived += 1;
        ShortLivedGuard { lock: self }
    }

    /// Enter the long-lived section: claim the flag first so new short-lived
    /// writers queue behind us, then drain the ones already in flight.
    pub(crate) fn long_lived_section(&self) -> LongLivedGuard<'_> {
        let mut state = self.state();
        state.long_lived_active = true;
        while state.short_lived > 0 {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        LongLivedGuard { lock: self }
    }

    #[cfg(test)]
    fn snapshot(&self) -> (usize, bool) {
        let state = self.state();
        (state.short_lived, state.long_lived_active)
    }
}

/// Releases the short-lived slot on every exit path.
#[must_use]
pub(crate) struct ShortLivedGuard<'a> {
    lock: &'a ConnectionLock,
}

impl Drop for ShortLivedGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.state();
        state.short_lived -= 1;
        drop(state);
        self.lock.cond.notify_all();
    }
}

/// Releases the long-lived flag on every exit path.
#[must_use]
pub(crate) struct LongLivedGuard<'a> {
    lock: &'a ConnectionLock,
}

impl Drop for LongLivedGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lock.state();
        state.long_lived_active = false;
        drop(state);
        self.lock.cond.notify_all();
    }
}
