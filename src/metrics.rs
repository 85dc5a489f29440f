use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared run-wide counters, cloned into every worker.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Items delivered to the output sink
    delivered: Arc<AtomicU64>,
    /// Items escalated to urgent priority (simulated failures)
    urgent_escalations: Arc<AtomicU64>,
    /// Enqueue retries after a timeout
    enqueue_retries: Arc<AtomicU64>,
    /// Idle dequeue timeouts observed by pickers
    idle_waits: Arc<AtomicU64>,
    /// Run start, for elapsed reporting
    start_time: Instant,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            delivered: Arc::new(AtomicU64::new(0)),
            urgent_escalations: Arc::new(AtomicU64::new(0)),
            enqueue_retries: Arc::new(AtomicU64::new(0)),
            idle_waits: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_urgent_escalation(&self) {
        self.urgent_escalations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueue_retry(&self) {
        self.enqueue_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_wait(&self) {
        self.idle_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn total_urgent_escalations(&self) -> u64 {
        self.urgent_escalations.load(Ordering::Relaxed)
    }

    pub fn total_enqueue_retries(&self) -> u64 {
        self.enqueue_retries.load(Ordering::Relaxed)
    }

    pub fn total_idle_waits(&self) -> u64 {
        self.idle_waits.load(Ordering::Relaxed)
    }

    /// Get a snapshot of current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.total_delivered(),
            urgent_escalations: self.total_urgent_escalations(),
            enqueue_retries: self.total_enqueue_retries(),
            idle_waits: self.total_idle_waits(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of run counters at a point in time
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub delivered: u64,
    pub urgent_escalations: u64,
    pub enqueue_retries: u64,
    pub idle_waits: u64,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Format counters as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Delivered: {}, Urgent: {}, Enqueue retries: {}, Idle waits: {}, Elapsed: {:.2}s",
            self.delivered,
            self.urgent_escalations,
            self.enqueue_retries,
            self.idle_waits,
            self.elapsed.as_secs_f64()
        )
    }
}
