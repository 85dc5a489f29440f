use crate::worker::Role;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A worker hit a fatal condition and aborted the run
    #[error("{role} worker {id} failed: {reason}")]
    WorkerFailed {
        role: Role,
        id: usize,
        reason: String,
    },

    /// The run was cancelled before completion
    #[error("Pipeline run cancelled")]
    Cancelled,

    /// Thread join error
    #[error("Thread join error: {0}")]
    ThreadError(String),

    /// Final accounting mismatch: items delivered != items emitted
    #[error("Pipeline integrity failure: emitted {emitted} items, delivered {delivered}")]
    IntegrityFailure { emitted: u64, delivered: u64 },

    /// Sink I/O error
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}
