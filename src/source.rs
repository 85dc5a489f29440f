use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A finite, non-restartable item source shared by many workers.
///
/// Each item is handed out exactly once: the underlying iterator is
/// advanced under a single mutex, never copied per worker. Once the
/// iterator is exhausted every subsequent `claim` returns `None` and the
/// exhaustion event is recorded exactly once.
pub struct ItemSource<I: Iterator> {
    iter: Mutex<I>,
    emitted: AtomicU64,
    exhausted: AtomicBool,
}

impl<I: Iterator> ItemSource<I> {
    /// Wrap a finite iterator as a shared source.
    pub fn new(iter: I) -> Arc<Self> {
        Arc::new(Self {
            iter: Mutex::new(iter),
            emitted: AtomicU64::new(0),
            exhausted: AtomicBool::new(false),
        })
    }

    /// Claim the next item, or `None` once the source is exhausted.
    pub fn claim(&self) -> Option<I::Item> {
        // Fast path: once exhausted, never touch the iterator again.
        if self.exhausted.load(Ordering::Acquire) {
            return None;
        }

        let mut iter = self.iter.lock();
        match iter.next() {
            Some(item) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
                Some(item)
            }
            None => {
                self.exhausted.store(true, Ordering::Release);
                None
            }
        }
    }

    /// Whether the source has returned its terminal signal.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    /// Total items handed out so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}
