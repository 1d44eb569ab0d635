//! # miner-queue
//!
//! Retry-wrapping request queue.
//!
//! Turns any asynchronous operation into a drop-in replacement that funnels
//! every invocation through a single intake, retries failed invocations with
//! exponential backoff, and reports each outcome back to its own caller.
//! Callers never wait on each other: every queued call runs its own attempt
//! sequence on the Tokio scheduler.
//!
//! ## Architecture
//!
//! - `envelope`: one queued call (arguments + reply channel)
//! - `policy`: attempt limit and backoff schedule
//! - `dispatch`: the intake loop and the per-envelope attempt sequence
//! - `queue`: `RetryQueue` handle and the `wrap` factory
//!
//! ```rust,no_run
//! use miner_queue::{wrap, QueueError, RetryPolicy};
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Http(String),
//!     Queue(QueueError),
//! }
//!
//! impl std::fmt::Display for FetchError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         match self {
//!             FetchError::Http(message) => write!(f, "{}", message),
//!             FetchError::Queue(err) => write!(f, "{}", err),
//!         }
//!     }
//! }
//!
//! impl From<QueueError> for FetchError {
//!     fn from(err: QueueError) -> Self {
//!         FetchError::Queue(err)
//!     }
//! }
//!
//! async fn fetch(name: String) -> Result<usize, FetchError> {
//!     Err(FetchError::Http(format!("{} is unreachable", name)))
//! }
//!
//! # async fn run() -> Result<(), QueueError> {
//! let fetch = wrap("fetch", RetryPolicy::default(), fetch)?;
//! let outcome = fetch("lodash".to_string()).await;
//! assert!(outcome.is_err());
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod policy;
pub mod queue;

// Re-export main types
pub use dispatch::{EnvelopeState, QueueStats, StatsSnapshot};
pub use envelope::Envelope;
pub use error::QueueError;
pub use policy::{AttemptLimit, Backoff, RetryPolicy};
pub use queue::{wrap, Pending, RetryQueue};
