use parking_lot::{Condvar, Mutex};
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Priority value served before every normal item.
///
/// Lower values are served first; normal items are assigned
/// `URGENT_PRIORITY + len + 1` at enqueue time, so they always sort
/// behind urgent ones.
pub const URGENT_PRIORITY: u64 = 1;

/// An entry in the queue, ordered by `(priority, sequence)`.
///
/// `sequence` is assigned under the queue lock, so entries with equal
/// priority dequeue in insertion order.
struct Entry<T> {
    priority: u64,
    sequence: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.priority, self.sequence).cmp(&(other.priority, other.sequence))
    }
}

struct Inner<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    next_sequence: u64,
}

/// A capacity-bounded priority queue with blocking, deadline-bounded
/// enqueue and dequeue.
///
/// Producers block while the queue is full, consumers block while it is
/// empty; both waits are bounded by a caller-supplied timeout so the
/// queue can never hang a worker indefinitely. Service order is the
/// total order `(priority, sequence)` ascending.
pub struct BoundedPriorityQueue<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
    // Mirror of heap.len() for the lock-free len() heuristic.
    len: AtomicUsize,
    enqueue_timeouts: AtomicU64,
    dequeue_timeouts: AtomicU64,
}

impl<T> BoundedPriorityQueue<T> {
    /// Create a queue with the given fixed capacity.
    ///
    /// Panics if `capacity` is zero; the builder validates this before
    /// construction.
    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "queue capacity must be > 0");
        Arc::new(Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::with_capacity(capacity),
                next_sequence: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
            len: AtomicUsize::new(0),
            enqueue_timeouts: AtomicU64::new(0),
            dequeue_timeouts: AtomicU64::new(0),
        })
    }

    /// Insert an item, blocking up to `timeout` while the queue is full.
    ///
    /// On timeout the item is handed back to the caller so the enqueue
    /// can be retried without cloning.
    pub fn enqueue(&self, priority: u64, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();

        while inner.heap.len() >= self.capacity {
            if self.not_full.wait_until(&mut inner, deadline).timed_out()
                && inner.heap.len() >= self.capacity
            {
                self.enqueue_timeouts.fetch_add(1, Ordering::Relaxed);
                return Err(item);
            }
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.heap.push(Reverse(Entry {
            priority,
            sequence,
            item,
        }));
        self.len.store(inner.heap.len(), Ordering::Relaxed);
        drop(inner);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the minimum `(priority, sequence)` entry, blocking up to
    /// `timeout` while the queue is empty. Returns `None` on timeout.
    pub fn dequeue(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();

        while inner.heap.is_empty() {
            if self.not_empty.wait_until(&mut inner, deadline).timed_out()
                && inner.heap.is_empty()
            {
                self.dequeue_timeouts.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // The wait loop exits with the lock held and the heap non-empty.
        let Reverse(entry) = inner.heap.pop().expect("heap non-empty after wait");
        self.len.store(inner.heap.len(), Ordering::Relaxed);
        drop(inner);

        self.not_full.notify_one();
        Some(entry.item)
    }

    /// Instantaneous size. Racy by design: used only for the priority
    /// heuristic, never for correctness decisions.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the queue is currently empty (same raciness as `len`).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed capacity of the queue.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of enqueue attempts that timed out.
    pub fn enqueue_timeouts(&self) -> u64 {
        self.enqueue_timeouts.load(Ordering::Relaxed)
    }

    /// Number of dequeue attempts that timed out.
    pub fn dequeue_timeouts(&self) -> u64 {
        self.dequeue_timeouts.load(Ordering::Relaxed)
    }
}
