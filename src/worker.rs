use crate::backoff::Backoff;
use crate::coordinator::{CancelToken, ShutdownCoordinator};
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineStats;
use crate::queue::{BoundedPriorityQueue, URGENT_PRIORITY};
use crate::sink::Sink;
use crate::source::ItemSource;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Which pool a worker belongs to, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Processor,
    Picker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Processor => write!(f, "processor"),
            Role::Picker => write!(f, "picker"),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct ProcessorConfig {
    pub failure_rate_percent: u8,
    pub enqueue_timeout: Duration,
    pub retry_budget: Option<u32>,
    pub backoff: Backoff,
}

#[derive(Clone, Copy)]
pub(crate) struct PickerConfig {
    pub dequeue_timeout: Duration,
    pub backoff: Backoff,
}

/// Processor loop: claim, classify, enqueue with priority.
///
/// A simulated failure does not reprocess the item; it only escalates
/// its delivery priority to `URGENT_PRIORITY`. Every item is enqueued
/// exactly once per run. Normal items take
/// `URGENT_PRIORITY + queue.len() + 1`, with the length read at the
/// moment of each enqueue attempt, so congestion pushes them further
/// behind urgent ones.
pub(crate) fn run_processor<I>(
    id: usize,
    source: Arc<ItemSource<I>>,
    queue: Arc<BoundedPriorityQueue<I::Item>>,
    coordinator: Arc<ShutdownCoordinator>,
    cancel: CancelToken,
    stats: PipelineStats,
    config: ProcessorConfig,
) -> Result<()>
where
    I: Iterator,
{
    let mut rng = rand::thread_rng();

    loop {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let Some(item) = source.claim() else {
            coordinator.processor_done();
            debug!(worker = id, "processor: source exhausted, exiting");
            return Ok(());
        };

        let urgent = rng.gen_range(0..100u8) < config.failure_rate_percent;
        if urgent {
            stats.record_urgent_escalation();
        }

        let mut pending = item;
        let mut attempt: u32 = 0;
        loop {
            let priority = if urgent {
                URGENT_PRIORITY
            } else {
                URGENT_PRIORITY + queue.len() as u64 + 1
            };

            match queue.enqueue(priority, pending, config.enqueue_timeout) {
                Ok(()) => break,
                Err(returned) => {
                    pending = returned;
                    stats.record_enqueue_retry();

                    if let Some(budget) = config.retry_budget {
                        if attempt >= budget {
                            warn!(worker = id, budget, "processor: enqueue retry budget exhausted");
                            cancel.cancel();
                            return Err(PipelineError::WorkerFailed {
                                role: Role::Processor,
                                id,
                                reason: format!("enqueue retry budget of {budget} exhausted"),
                            });
                        }
                    }
                    if cancel.is_cancelled() {
                        return Err(PipelineError::Cancelled);
                    }

                    config.backoff.sleep(attempt);
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}

/// Picker loop: dequeue and forward to the sink.
///
/// On a dequeue timeout the worker backs off and re-checks the
/// termination predicate, reading "all processors done" strictly before
/// "queue empty". The reverse order could exit while a still-running
/// processor is mid-enqueue. The predicate is re-evaluated after every
/// timeout; it is never assumed sticky.
pub(crate) fn run_picker<T, S>(
    id: usize,
    queue: Arc<BoundedPriorityQueue<T>>,
    sink: Arc<S>,
    coordinator: Arc<ShutdownCoordinator>,
    cancel: CancelToken,
    stats: PipelineStats,
    config: PickerConfig,
) -> Result<()>
where
    S: Sink<T> + ?Sized,
{
    let mut idle_attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        match queue.dequeue(config.dequeue_timeout) {
            Some(item) => {
                idle_attempt = 0;
                if let Err(err) = sink.append(item) {
                    cancel.cancel();
                    return Err(PipelineError::WorkerFailed {
                        role: Role::Picker,
                        id,
                        reason: format!("sink append failed: {err}"),
                    });
                }
                stats.record_delivered();
            }
            None => {
                stats.record_idle_wait();
                config.backoff.sleep(idle_attempt);
                idle_attempt = idle_attempt.saturating_add(1).min(16);

                if coordinator.all_processors_done() && queue.is_empty() {
                    debug!(worker = id, "picker: producers done and queue drained, exiting");
                    return Ok(());
                }
            }
        }
    }
}
