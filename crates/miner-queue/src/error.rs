//! Pipeline-level failures.
//!
//! These never come from the wrapped operation itself. They reach the caller
//! through the operation's own error type via `From<QueueError>`.

use thiserror::Error;

/// Failures raised by the queue rather than by the wrapped operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No Tokio runtime was available to host the dispatcher
    #[error("Retry queue '{label}' requires a running Tokio runtime")]
    NoRuntime { label: String },

    /// The intake no longer accepts envelopes (dispatcher has stopped)
    #[error("Retry queue '{label}' is closed")]
    Closed { label: String },

    /// The attempt sequence ended without completing the envelope
    #[error("Retry queue '{label}' abandoned the request before it completed")]
    Abandoned { label: String },

    /// Policy configuration rejected at construction time
    #[error("Invalid retry policy: {reason}")]
    InvalidPolicy { reason: String },
}
