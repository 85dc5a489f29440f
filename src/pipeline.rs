use crate::backoff::Backoff;
use crate::coordinator::{CancelToken, ShutdownCoordinator};
use crate::error::{PipelineError, Result};
use crate::metrics::{PipelineStats, StatsSnapshot};
use crate::queue::BoundedPriorityQueue;
use crate::sink::Sink;
use crate::source::ItemSource;
use crate::worker::{self, PickerConfig, ProcessorConfig};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Builder for pipeline runs.
pub struct PipelineBuilder {
    processor_count: usize,
    picker_count: usize,
    queue_capacity: usize,
    failure_rate_percent: u8,
    enqueue_timeout: Duration,
    dequeue_timeout: Duration,
    retry_budget: Option<u32>,
    backoff: Backoff,
}

impl PipelineBuilder {
    /// Create a builder with the reference defaults: 4 processors,
    /// 2 pickers, capacity 10, 2% failure rate, 1s timeouts, unbounded
    /// enqueue retries.
    pub fn new() -> Self {
        Self {
            processor_count: 4,
            picker_count: 2,
            queue_capacity: 10,
            failure_rate_percent: 2,
            enqueue_timeout: Duration::from_secs(1),
            dequeue_timeout: Duration::from_secs(1),
            retry_budget: None,
            backoff: Backoff::new(),
        }
    }

    /// Number of processor workers
    pub fn processors(mut self, count: usize) -> Self {
        self.processor_count = count;
        self
    }

    /// Number of picker workers
    pub fn pickers(mut self, count: usize) -> Self {
        self.picker_count = count;
        self
    }

    /// Fixed queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Probability (in whole percent, 0-100) that an item draws the
    /// simulated-failure outcome and is escalated to urgent priority
    pub fn failure_rate_percent(mut self, percent: u8) -> Self {
        self.failure_rate_percent = percent;
        self
    }

    /// Bound on each blocking enqueue attempt
    pub fn enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Bound on each blocking dequeue attempt
    pub fn dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    /// Maximum enqueue retries before a processor fails the run.
    /// `None` retries indefinitely with backoff.
    pub fn retry_budget(mut self, budget: Option<u32>) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Backoff policy applied after timed-out enqueues and idle
    /// dequeues
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Validate the configuration and build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        if self.queue_capacity == 0 {
            return Err(PipelineError::ConfigError(
                "queue capacity must be > 0".into(),
            ));
        }
        if self.processor_count == 0 {
            return Err(PipelineError::ConfigError(
                "at least one processor worker is required".into(),
            ));
        }
        if self.picker_count == 0 {
            return Err(PipelineError::ConfigError(
                "at least one picker worker is required".into(),
            ));
        }
        if self.failure_rate_percent > 100 {
            return Err(PipelineError::ConfigError(format!(
                "failure rate must be 0-100 percent, got {}",
                self.failure_rate_percent
            )));
        }
        if self.enqueue_timeout.is_zero() || self.dequeue_timeout.is_zero() {
            return Err(PipelineError::ConfigError(
                "timeouts must be non-zero".into(),
            ));
        }

        Ok(Pipeline {
            processor_count: self.processor_count,
            picker_count: self.picker_count,
            queue_capacity: self.queue_capacity,
            processor_config: ProcessorConfig {
                failure_rate_percent: self.failure_rate_percent,
                enqueue_timeout: self.enqueue_timeout,
                retry_budget: self.retry_budget,
                backoff: self.backoff,
            },
            picker_config: PickerConfig {
                dequeue_timeout: self.dequeue_timeout,
                backoff: self.backoff,
            },
            cancel: CancelToken::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured pipeline, ready to run a source to exhaustion.
pub struct Pipeline {
    processor_count: usize,
    picker_count: usize,
    queue_capacity: usize,
    processor_config: ProcessorConfig,
    picker_config: PickerConfig,
    cancel: CancelToken,
}

impl Pipeline {
    /// Token for aborting the run early from another thread. Workers
    /// observe it within one configured timeout.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the pipeline: spawn the processor and picker pools, drain
    /// `source` into `sink`, join every worker, and verify the final
    /// accounting.
    ///
    /// The run completes when the source is exhausted, the queue has
    /// drained, and every worker has returned. A fatal worker error
    /// cancels the remaining workers and aborts the run.
    pub fn run<I, S>(self, source: Arc<ItemSource<I>>, sink: Arc<S>) -> Result<RunReport>
    where
        I: Iterator + Send + 'static,
        I::Item: Send + 'static,
        S: Sink<I::Item> + 'static,
    {
        let queue = BoundedPriorityQueue::new(self.queue_capacity);
        let coordinator = ShutdownCoordinator::new(self.processor_count);
        let stats = PipelineStats::new();

        info!(
            processors = self.processor_count,
            pickers = self.picker_count,
            capacity = self.queue_capacity,
            "pipeline: starting run"
        );

        let mut handles = Vec::with_capacity(self.processor_count + self.picker_count);

        for id in 0..self.processor_count {
            let source = Arc::clone(&source);
            let queue = Arc::clone(&queue);
            let coordinator = Arc::clone(&coordinator);
            let cancel = self.cancel.clone();
            let stats = stats.clone();
            let config = self.processor_config;
            handles.push(thread::spawn(move || {
                worker::run_processor(id, source, queue, coordinator, cancel, stats, config)
            }));
        }

        for id in 0..self.picker_count {
            let queue = Arc::clone(&queue);
            let sink = Arc::clone(&sink);
            let coordinator = Arc::clone(&coordinator);
            let cancel = self.cancel.clone();
            let stats = stats.clone();
            let config = self.picker_config;
            handles.push(thread::spawn(move || {
                worker::run_picker(id, queue, sink, coordinator, cancel, stats, config)
            }));
        }

        // Join everything before judging the run. A fatal worker error
        // outranks the Cancelled errors it causes in the others.
        let mut fatal: Option<PipelineError> = None;
        let mut cancelled = false;
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(PipelineError::Cancelled)) => cancelled = true,
                Ok(Err(err)) => {
                    if fatal.is_none() {
                        fatal = Some(err);
                    }
                }
                Err(_) => {
                    if fatal.is_none() {
                        fatal = Some(PipelineError::ThreadError("worker panicked".into()));
                    }
                }
            }
        }

        // A fatal worker error outranks a flush failure: the role/id it
        // carries is the report the operator needs.
        let flush_result = sink.flush();

        if let Some(err) = fatal {
            return Err(err);
        }
        flush_result?;
        if cancelled {
            return Err(PipelineError::Cancelled);
        }

        let emitted = source.emitted();
        let delivered = stats.total_delivered();
        debug!(emitted, delivered, "pipeline: run joined");

        if emitted != delivered {
            return Err(PipelineError::IntegrityFailure { emitted, delivered });
        }

        let report = RunReport {
            emitted,
            delivered,
            stats: stats.snapshot(),
        };
        info!(emitted, delivered, "pipeline: run complete");
        Ok(report)
    }
}

/// Final accounting for a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Items handed out by the source
    pub emitted: u64,
    /// Items delivered to the sink
    pub delivered: u64,
    /// Run counters at completion
    pub stats: StatsSnapshot,
}

impl RunReport {
    /// Whether the run conserved every item. Always true for a report
    /// returned by [`Pipeline::run`]; a mismatch surfaces as
    /// [`PipelineError::IntegrityFailure`] instead.
    pub fn is_consistent(&self) -> bool {
        self.emitted == self.delivered
    }

    /// Human-readable run summary
    pub fn format(&self) -> String {
        format!(
            "Emitted: {}, {}, Verdict: {}",
            self.emitted,
            self.stats.format(),
            if self.is_consistent() { "PASS" } else { "FAIL" }
        )
    }
}
