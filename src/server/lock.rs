//! Bounded-reader, single-writer lock built from a mutex and a condition variable.
//!
//! [`SyncLock`] admits at most `max_readers` concurrent readers or exactly one
//! writer. Every release broadcasts, and every waiter re-checks its own
//! admission predicate after waking.
//!
//! There is no fairness between readers and writers: a steady stream of
//! readers admitted below the reader cap can keep a writer waiting
//! indefinitely. The reader cap is exact and writers get no preference.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Default cap on concurrent readers.
pub const DEFAULT_MAX_READERS: usize = 32;

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writer_active: bool,
}

/// A readers-writer lock with a fixed cap on concurrent readers.
///
/// `read()` is the acquire-read operation and dropping the returned guard is
/// the release-read operation; `write()` and its guard mirror that for the
/// writer side.
pub struct SyncLock<T> {
    state: Mutex<LockState>,
    cond: Condvar,
    max_readers: usize,
    value: UnsafeCell<T>,
}

// Readers only get `&T`, so sharing needs `T: Sync`; the writer may move
// data in and out, so it needs `T: Send`.
unsafe impl<T: Send> Send for SyncLock<T> {}
unsafe impl<T: Send + Sync> Sync for SyncLock<T> {}

impl<T> SyncLock<T> {
    /// Creates a lock admitting at most `max_readers` concurrent readers.
    ///
    /// A cap of zero would never admit a reader, so it is raised to one.
    pub fn new(value: T, max_readers: usize) -> Self {
        SyncLock {
            state: Mutex::new(LockState::default()),
            cond: Condvar::new(),
            max_readers: max_readers.max(1),
            value: UnsafeCell::new(value),
        }
    }

    /// Creates a lock with [`DEFAULT_MAX_READERS`].
    pub fn with_default_readers(value: T) -> Self {
        Self::new(value, DEFAULT_MAX_READERS)
    }

    /// The configured reader cap.
    pub fn max_readers(&self) -> usize {
        self.max_readers
    }

    /// Blocks until no writer is active and fewer than `max_readers` readers
    /// hold the lock, then admits the caller as a reader.
    pub fn read(&self) -> SyncReadGuard<'_, T> {
        let state = self.lock_state();
        let mut state = self
            .cond
            .wait_while(state, |s| s.writer_active || s.readers >= self.max_readers)
            .unwrap_or_else(PoisonError::into_inner);
        state.readers += 1;
        SyncReadGuard { lock: self }
    }

    /// Blocks until there are no readers and no writer, then admits the
    /// caller as the single writer.
    pub fn write(&self) -> SyncWriteGuard<'_, T> {
        let state = self.lock_state();
        let mut state = self
            .cond
            .wait_while(state, |s| s.readers > 0 || s.writer_active)
            .unwrap_or_else(PoisonError::into_inner);
        state.writer_active = true;
        SyncWriteGuard { lock: self }
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Mutable access without locking; the borrow checker proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        // The state is two plain fields updated in one step, so a poisoned
        // mutex still holds a consistent value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_read(&self) {
        let mut state = self.lock_state();
        state.readers -= 1;
        self.cond.notify_all();
    }

    fn release_write(&self) {
        let mut state = self.lock_state();
        state.writer_active = false;
        self.cond.notify_all();
    }
}

impl<T: Default> Default for SyncLock<T> {
    fn default() -> Self {
        Self::with_default_readers(T::default())
    }
}

impl<T> fmt::Debug for SyncLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("SyncLock")
            .field("readers", &state.readers)
            .field("writer_active", &state.writer_active)
            .field("max_readers", &self.max_readers)
            .finish_non_exhaustive()
    }
}

/// Shared access to the value of a [`SyncLock`]. Dropping it releases the
/// reader slot.
#[must_use = "the read lock is released as soon as the guard is dropped"]
pub struct SyncReadGuard<'a, T> {
    lock: &'a SyncLock<T>,
}

impl<T> Deref for SyncReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: while a reader guard exists no writer is admitted.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> Drop for SyncReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Exclusive access to the value of a [`SyncLock`]. Dropping it releases the
/// writer slot.
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct SyncWriteGuard<'a, T> {
    lock: &'a SyncLock<T>,
}

impl<T> Deref for SyncWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the writer excludes every reader and every other writer.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SyncWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for SyncWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}
