//! Unbounded lock-free multi-producer/multi-consumer FIFO queue.
//!
//! [`TaskQueue`] is the two-pointer linked queue with a permanent sentinel
//! node: `head` always points at the sentinel, whose successor holds the
//! oldest value. Enqueue links a node after `tail` with a compare-and-swap
//! and then swings `tail` forward; dequeue swings `head` to the successor,
//! which becomes the new sentinel. Any thread that sees `tail` lagging helps
//! move it forward before retrying, so no operation waits on another thread.
//!
//! Retired sentinels are handed to `crossbeam`'s epoch collector and freed
//! only once no pinned thread can still be dereferencing them.

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use crossbeam::utils::CachePadded;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Node<T> {
    /// Uninitialized in the sentinel, and again once the value has been
    /// moved out by the dequeue that made this node the sentinel.
    value: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

/// An unbounded, lock-free FIFO queue.
pub struct TaskQueue<T> {
    head: CachePadded<Atomic<Node<T>>>,
    tail: CachePadded<Atomic<Node<T>>>,
    len: CachePadded<AtomicUsize>,
}

// Values cross threads by move only; no `&T` is ever shared.
unsafe impl<T: Send> Send for TaskQueue<T> {}
unsafe impl<T: Send> Sync for TaskQueue<T> {}

impl<T> TaskQueue<T> {
    /// Creates an empty queue holding only its sentinel.
    pub fn new() -> Self {
        let queue = TaskQueue {
            head: CachePadded::new(Atomic::null()),
            tail: CachePadded::new(Atomic::null()),
            len: CachePadded::new(AtomicUsize::new(0)),
        };
        let sentinel = Owned::new(Node {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        });
        // SAFETY: the queue is not shared yet.
        let guard = unsafe { epoch::unprotected() };
        let sentinel = sentinel.into_shared(guard);
        queue.head.store(sentinel, Ordering::Relaxed);
        queue.tail.store(sentinel, Ordering::Relaxed);
        queue
    }

    /// Appends a value at the tail.
    pub fn enqueue(&self, value: T) {
        let guard = &epoch::pin();
        let new = Owned::new(Node {
            value: MaybeUninit::new(value),
            next: Atomic::null(),
        })
        .into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: `tail` is never null and the guard keeps it alive.
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if tail != self.tail.load(Ordering::Acquire, guard) {
                continue;
            }

            if next.is_null() {
                if tail_ref
                    .next
                    .compare_exchange(
                        Shared::null(),
                        new,
                        Ordering::Release,
                        Ordering::Relaxed,
                        guard,
                    )
                    .is_ok()
                {
                    // Best effort: a failure means another thread already
                    // helped `tail` past this node.
                    let _ = self.tail.compare_exchange(
                        tail,
                        new,
                        Ordering::Release,
                        Ordering::Relaxed,
                        guard,
                    );
                    self.len.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            } else {
                // Another producer linked a node but has not moved `tail` yet.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
            }
        }
    }

    /// Removes the value at the head, or returns `None` if the queue was
    /// empty at the moment it was inspected.
    pub fn dequeue(&self) -> Option<T> {
        let guard = &epoch::pin();
        self.dequeue_with(guard)
    }

    fn dequeue_with(&self, guard: &Guard) -> Option<T> {
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let tail = self.tail.load(Ordering::Acquire, guard);
            // SAFETY: `head` is never null and the guard keeps it alive.
            let next = unsafe { head.deref() }.next.load(Ordering::Acquire, guard);

            if head != self.head.load(Ordering::Acquire, guard) {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                // `tail` is lagging behind a completed link.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
                continue;
            }

            if next.is_null() {
                continue;
            }

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::Relaxed);
                // SAFETY: winning the CAS made `next` the sentinel and gave
                // this thread sole ownership of its value, which no other
                // dequeue will read. The old sentinel is unreachable from
                // the queue and is destroyed once every current pin ends.
                unsafe {
                    let value = next.deref().value.assume_init_read();
                    guard.defer_destroy(head);
                    return Some(value);
                }
            }
        }
    }

    /// Whether the queue held no values at the moment it was inspected.
    ///
    /// Unlike [`len`](Self::len) this reads the node chain itself, so an
    /// enqueue that has completed is always observed.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        // SAFETY: `head` is never null and the guard keeps it alive.
        unsafe { head.deref() }
            .next
            .load(Ordering::Acquire, guard)
            .is_null()
    }

    /// Advisory element count.
    ///
    /// Maintained separately from the node chain, so it can briefly disagree
    /// with a concurrent enqueue or dequeue. Use it for heuristics and
    /// reporting, never to decide whether a value is available.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TaskQueue<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` proves no other thread can reach the queue.
        unsafe {
            let guard = epoch::unprotected();
            while self.dequeue_with(guard).is_some() {}
            let sentinel = self.head.load(Ordering::Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}

impl<T> fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
