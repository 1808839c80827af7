//! Counting semaphore with a one-way shutdown flag.
//!
//! The [`Gate`] bounds how many consumers are inside their "is there work, or
//! are we done" decision and broadcasts the terminal drain-and-exit
//! condition. Its mutex also guards that decision: a [`GatePermit`] keeps the
//! mutex locked from [`Gate::acquire`] until it is dropped, except while it
//! sleeps in [`GatePermit::wait_for_work`]. Producers notify through the same
//! mutex, so a consumer cannot check for work, miss a concurrent enqueue and
//! then sleep through its notification.
//!
//! Waiting for a permit and waiting for work are separate condition
//! variables on the one mutex, so a single wake-up for new work always
//! reaches a consumer that is waiting for work.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug)]
struct GateState {
    available: usize,
    finished: bool,
}

/// Counting semaphore of fixed capacity plus a shutdown flag.
pub struct Gate {
    capacity: usize,
    state: Mutex<GateState>,
    permit_freed: Condvar,
    work_ready: Condvar,
}

impl Gate {
    /// Creates a gate with `capacity` permits, all available.
    pub fn new(capacity: usize) -> Self {
        Gate {
            capacity,
            state: Mutex::new(GateState {
                available: capacity,
                finished: false,
            }),
            permit_freed: Condvar::new(),
            work_ready: Condvar::new(),
        }
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    ///
    /// Locks the gate's mutex, so a thread holding a [`GatePermit`] of this
    /// gate would deadlock here.
    pub(crate) fn available(&self) -> usize {
        self.lock_state().available
    }

    /// Whether shutdown has been signalled. Same locking caveat as
    /// [`available`](Self::available); permit holders use
    /// [`GatePermit::is_finished`].
    pub(crate) fn is_finished(&self) -> bool {
        self.lock_state().finished
    }

    /// Blocks until a permit is free or shutdown has been signalled.
    ///
    /// The returned permit holds the gate's mutex. Once shutdown is signalled
    /// callers are admitted even with no permit free, so that every consumer
    /// can observe completion; such a permit does not count against the
    /// capacity.
    pub fn acquire(&self) -> GatePermit<'_> {
        let state = self.lock_state();
        let mut state = self
            .permit_freed
            .wait_while(state, |s| s.available == 0 && !s.finished)
            .unwrap_or_else(PoisonError::into_inner);
        let counted = state.available > 0;
        if counted {
            state.available -= 1;
        }
        GatePermit {
            gate: self,
            state: Some(state),
            counted,
        }
    }

    /// Wakes one waiter after new work has been published.
    ///
    /// Takes the mutex so the wake-up cannot fall between a consumer's
    /// emptiness check and its wait.
    pub fn notify_work(&self) {
        let _state = self.lock_state();
        self.work_ready.notify_one();
    }

    /// Sets the shutdown flag and wakes every waiter. Idempotent.
    pub fn signal_shutdown(&self) {
        let mut state = self.lock_state();
        if !state.finished {
            debug!("gate shutdown signalled");
        }
        state.finished = true;
        self.permit_freed.notify_all();
        self.work_ready.notify_all();
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Gate")
            .field("capacity", &self.capacity)
            .field("available", &state.available)
            .field("finished", &state.finished)
            .finish()
    }
}

/// A held gate permit. Dropping it is the release operation: the permit is
/// returned, one thread waiting in [`Gate::acquire`] is woken and the gate's
/// mutex is unlocked.
#[must_use = "dropping the permit releases it immediately"]
pub struct GatePermit<'a> {
    gate: &'a Gate,
    // Only `None` transiently inside `wait_for_work`.
    state: Option<MutexGuard<'a, GateState>>,
    counted: bool,
}

impl GatePermit<'_> {
    /// Sleeps until `has_work` returns true or shutdown is signalled.
    ///
    /// The mutex is released while sleeping and re-acquired before
    /// `has_work` is evaluated again, so the check and whatever the caller
    /// does next under this permit are atomic with respect to other permit
    /// holders.
    pub fn wait_for_work<F>(&mut self, mut has_work: F)
    where
        F: FnMut() -> bool,
    {
        let Some(state) = self.state.take() else {
            return;
        };
        let state = self
            .gate
            .work_ready
            .wait_while(state, |s| !s.finished && !has_work())
            .unwrap_or_else(PoisonError::into_inner);
        self.state = Some(state);
    }

    /// Whether shutdown has been signalled, read under the held mutex.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            Some(state) => state.finished,
            None => self.gate.is_finished(),
        }
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => self.gate.lock_state(),
        };
        if self.counted {
            state.available += 1;
        }
        self.gate.permit_freed.notify_one();
    }
}

impl fmt::Debug for GatePermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatePermit")
            .field("counted", &self.counted)
            .finish_non_exhaustive()
    }
}
