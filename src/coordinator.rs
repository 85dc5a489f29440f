use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks "no producer will ever enqueue again".
///
/// The counter starts at the number of spawned processors and is
/// decremented exactly once per processor on its natural exit. Pickers
/// must read `all_processors_done()` strictly before checking that the
/// queue is empty; the reverse order can miss an in-flight enqueue.
pub struct ShutdownCoordinator {
    active_processors: AtomicUsize,
}

impl ShutdownCoordinator {
    /// Create a coordinator for `processor_count` producers.
    pub fn new(processor_count: usize) -> Arc<Self> {
        Arc::new(Self {
            active_processors: AtomicUsize::new(processor_count),
        })
    }

    /// Record one processor's natural exit. Must be called exactly once
    /// per processor.
    pub fn processor_done(&self) {
        let previous = self.active_processors.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "processor_done called more times than processors spawned");
    }

    /// Whether every processor has exited and no further enqueue can
    /// ever happen.
    pub fn all_processors_done(&self) -> bool {
        self.active_processors.load(Ordering::Acquire) == 0
    }

    /// Current number of processors still running.
    pub fn active_processors(&self) -> usize {
        self.active_processors.load(Ordering::Acquire)
    }
}

/// Cooperative cancellation shared by every worker in a run.
///
/// Every blocking call in the pipeline is deadline-bounded, so workers
/// poll the token between waits; abort latency is at most one configured
/// timeout. Set on fatal worker error, or by the embedder for early
/// abort.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of the run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
