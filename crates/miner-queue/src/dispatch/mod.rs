//! Intake loop and per-envelope attempt sequence.
//!
//! The dispatcher drains an unbounded channel and spawns one task per
//! envelope. Each task runs the attempt/backoff loop to a terminal state on
//! its own, so a call that is backing off never holds up any other call.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

use crate::envelope::Envelope;
use crate::policy::RetryPolicy;

/// Lifecycle of one envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Received by the dispatcher, no attempt made yet
    Pending,
    /// Operation future in progress
    Executing,
    /// Sleeping before the next attempt
    Waiting,
    /// Terminal: the operation returned a value
    Succeeded,
    /// Terminal: attempts exhausted
    Failed,
}

impl EnvelopeState {
    /// Terminal states accept no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnvelopeState::Succeeded | EnvelopeState::Failed)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_move_to(&self, next: EnvelopeState) -> bool {
        use EnvelopeState::*;
        matches!(
            (self, next),
            (Pending, Executing)
                | (Executing, Succeeded)
                | (Executing, Waiting)
                | (Executing, Failed)
                | (Waiting, Executing)
        )
    }
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvelopeState::Pending => "pending",
            EnvelopeState::Executing => "executing",
            EnvelopeState::Waiting => "waiting",
            EnvelopeState::Succeeded => "succeeded",
            EnvelopeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters shared between a queue handle and its dispatcher
#[derive(Debug, Default)]
pub struct QueueStats {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    retries: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time copy of [`QueueStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Envelopes accepted by the intake
    pub submitted: u64,
    /// Envelopes answered with a value
    pub succeeded: u64,
    /// Envelopes answered with the last error after exhausting attempts
    pub failed: u64,
    /// Envelopes whose attempt task ended without answering
    pub abandoned: u64,
    /// Backoff sleeps started, across all envelopes
    pub retries: u64,
    /// Envelopes currently executing or waiting
    pub in_flight: u64,
}

impl StatsSnapshot {
    /// Envelopes that reached a terminal outcome
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.abandoned
    }
}

impl QueueStats {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn revoke_submitted(&self) {
        self.submitted.fetch_sub(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Per-envelope bookkeeping; counts the envelope as abandoned if dropped
/// before reaching a terminal state (panic or runtime shutdown).
struct AttemptSequence {
    id: u64,
    attempts: u32,
    state: EnvelopeState,
    stats: Arc<QueueStats>,
}

impl AttemptSequence {
    fn start(id: u64, stats: Arc<QueueStats>) -> Self {
        stats.in_flight.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            attempts: 0,
            state: EnvelopeState::Pending,
            stats,
        }
    }

    fn transition(&mut self, next: EnvelopeState) {
        debug_assert!(
            self.state.can_move_to(next),
            "illegal envelope transition {} -> {}",
            self.state,
            next
        );
        trace!(envelope = self.id, from = %self.state, to = %next, "Envelope transition");

        match next {
            EnvelopeState::Executing => self.attempts += 1,
            EnvelopeState::Waiting => {
                self.stats.retries.fetch_add(1, Ordering::Relaxed);
            },
            EnvelopeState::Succeeded => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
            },
            EnvelopeState::Failed => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            },
            EnvelopeState::Pending => {},
        }
        self.state = next;
    }
}

impl Drop for AttemptSequence {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::Relaxed);
        if !self.state.is_terminal() {
            self.stats.abandoned.fetch_add(1, Ordering::Relaxed);
            warn!(
                envelope = self.id,
                attempts = self.attempts,
                state = %self.state,
                "Envelope abandoned before completion"
            );
        }
    }
}

/// Receive envelopes until every queue handle is dropped, spawning one
/// attempt sequence per envelope.
pub(crate) async fn run_dispatcher<A, R, E, F, Fut>(
    label: Arc<str>,
    mut intake: UnboundedReceiver<Envelope<A, R, E>>,
    operation: Arc<F>,
    policy: Arc<RetryPolicy>,
    stats: Arc<QueueStats>,
) where
    A: Clone + Send + 'static,
    R: Send + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    info!(queue = %label, policy = ?policy, "Dispatcher started");

    let mut dispatched: u64 = 0;
    while let Some(envelope) = intake.recv().await {
        let id = dispatched;
        dispatched += 1;

        tokio::spawn(run_envelope(
            label.clone(),
            id,
            envelope,
            operation.clone(),
            policy.clone(),
            stats.clone(),
        ));
    }

    debug!(queue = %label, dispatched, "Dispatcher stopped, intake closed");
}

/// Drive one envelope through attempts and backoff until it succeeds or the
/// policy gives up.
pub(crate) async fn run_envelope<A, R, E, F, Fut>(
    label: Arc<str>,
    id: u64,
    envelope: Envelope<A, R, E>,
    operation: Arc<F>,
    policy: Arc<RetryPolicy>,
    stats: Arc<QueueStats>,
) where
    A: Clone,
    E: fmt::Display,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut sequence = AttemptSequence::start(id, stats);

    loop {
        sequence.transition(EnvelopeState::Executing);
        debug!(queue = %label, envelope = id, attempt = sequence.attempts, "Executing");

        let error = match operation(envelope.args.clone()).await {
            Ok(value) => {
                sequence.transition(EnvelopeState::Succeeded);
                envelope.complete(Ok(value));
                return;
            },
            Err(error) => error,
        };

        if !policy.should_retry(sequence.attempts) {
            warn!(
                queue = %label,
                envelope = id,
                attempts = sequence.attempts,
                error = %error,
                "Attempts exhausted"
            );
            sequence.transition(EnvelopeState::Failed);
            envelope.complete(Err(error));
            return;
        }

        let delay = policy.delay_for(sequence.attempts - 1);
        if policy.is_unlimited() {
            warn!(
                queue = %label,
                envelope = id,
                attempt = sequence.attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying without limit"
            );
        } else {
            debug!(
                queue = %label,
                envelope = id,
                attempt = sequence.attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, backing off"
            );
        }

        if !envelope.is_awaited() {
            debug!(queue = %label, envelope = id, "Caller stopped waiting, retrying anyway");
        }

        sequence.transition(EnvelopeState::Waiting);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests;
