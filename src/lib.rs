//! A bounded concurrent priority queue pipeline with backpressure and
//! cooperative shutdown.
//!
//! A finite [`ItemSource`] is drained by a pool of processor workers
//! that classify each item (success, or a simulated failure that only
//! escalates delivery priority) and enqueue it into a shared
//! [`BoundedPriorityQueue`]. A pool of picker workers drains the queue
//! into a [`Sink`]. The pools agree on completion without loss or
//! duplication: processors decrement a live counter on exit, and a
//! picker exits only after seeing that counter at zero and then an
//! empty queue.
//!
//! # Features
//!
//! - Capacity-bounded priority queue with condvar wakeup and
//!   deadline-bounded enqueue/dequeue
//! - FIFO tie-break among equal priorities via a queue-assigned
//!   sequence number
//! - Exactly-once handout from a shared source, exactly-once delivery
//!   to the sink
//! - Randomized-backoff retry on enqueue timeouts, with an optional
//!   retry budget
//! - Cooperative cancellation observed at every bounded wait
//! - Final accounting verdict: emitted vs. delivered
//!
//! # Example
//!
//! ```ignore
//! use priority_pipeline::{ItemSource, MemorySink, PipelineBuilder};
//! use std::sync::Arc;
//!
//! let pipeline = PipelineBuilder::new()
//!     .processors(4)
//!     .pickers(2)
//!     .queue_capacity(10)
//!     .build()?;
//!
//! let sink = Arc::new(MemorySink::new());
//! let report = pipeline.run(ItemSource::new(0..5000u64), Arc::clone(&sink))?;
//! assert!(report.is_consistent());
//! ```

pub mod backoff;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod sink;
pub mod source;
pub mod worker;

// Re-exports for convenience
pub use backoff::Backoff;
pub use coordinator::{CancelToken, ShutdownCoordinator};
pub use error::{PipelineError, Result};
pub use metrics::{PipelineStats, StatsSnapshot};
pub use pipeline::{Pipeline, PipelineBuilder, RunReport};
pub use queue::{BoundedPriorityQueue, URGENT_PRIORITY};
pub use sink::{LineSink, MemorySink, Sink};
pub use source::ItemSource;
pub use worker::Role;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
