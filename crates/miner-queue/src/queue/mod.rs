//! Queue handle and wrapper factory

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::dispatch::{run_dispatcher, QueueStats, StatsSnapshot};
use crate::envelope::Envelope;
use crate::policy::RetryPolicy;
use crate::QueueError;

/// Cloneable handle to one dispatcher and its retry policy.
///
/// All clones feed the same intake. The dispatcher stops once the last
/// clone is dropped; calls already accepted still run to completion.
pub struct RetryQueue<A, R, E> {
    label: Arc<str>,
    intake: mpsc::UnboundedSender<Envelope<A, R, E>>,
    policy: Arc<RetryPolicy>,
    stats: Arc<QueueStats>,
}

impl<A, R, E> Clone for RetryQueue<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            intake: self.intake.clone(),
            policy: self.policy.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<A, R, E> fmt::Debug for RetryQueue<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryQueue")
            .field("label", &self.label)
            .field("policy", &self.policy)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl<A, R, E> RetryQueue<A, R, E>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    E: From<QueueError> + fmt::Display + Send + 'static,
{
    /// Start a dispatcher for `operation` on the current Tokio runtime
    pub fn spawn<F, Fut>(
        label: impl Into<String>,
        policy: RetryPolicy,
        operation: F,
    ) -> Result<Self, QueueError>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let label: Arc<str> = Arc::from(label.into());
        policy.validate()?;

        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime {
            label: label.to_string(),
        })?;

        let (intake, receiver) = mpsc::unbounded_channel();
        let policy = Arc::new(policy);
        let stats = Arc::new(QueueStats::default());

        runtime.spawn(run_dispatcher(
            label.clone(),
            receiver,
            Arc::new(operation),
            policy.clone(),
            stats.clone(),
        ));

        Ok(Self {
            label,
            intake,
            policy,
            stats,
        })
    }

    /// Queue one call and return its pending outcome. Never blocks.
    pub fn call(&self, args: A) -> Pending<R, E> {
        let (envelope, receiver) = Envelope::new(args);

        self.stats.record_submitted();
        if self.intake.send(envelope).is_err() {
            self.stats.revoke_submitted();
            return Pending::rejected(QueueError::Closed {
                label: self.label.to_string(),
            });
        }

        Pending::waiting(self.label.clone(), receiver)
    }
}

impl<A, R, E> RetryQueue<A, R, E> {
    /// Name used in log records for this queue
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Policy every call of this queue runs under
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

/// Wrap `operation` into a function with the same argument and result
/// types whose calls go through a new [`RetryQueue`].
pub fn wrap<A, R, E, F, Fut>(
    label: impl Into<String>,
    policy: RetryPolicy,
    operation: F,
) -> Result<impl Fn(A) -> Pending<R, E> + Clone + Send + Sync + 'static, QueueError>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
    E: From<QueueError> + fmt::Display + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    let queue = RetryQueue::spawn(label, policy, operation)?;
    Ok(move |args| queue.call(args))
}

/// Outcome of one queued call
pub struct Pending<R, E> {
    inner: PendingInner<R, E>,
}

enum PendingInner<R, E> {
    Waiting {
        label: Arc<str>,
        receiver: oneshot::Receiver<Result<R, E>>,
    },
    Rejected(QueueError),
}

impl<R, E> Pending<R, E> {
    fn waiting(label: Arc<str>, receiver: oneshot::Receiver<Result<R, E>>) -> Self {
        Self {
            inner: PendingInner::Waiting { label, receiver },
        }
    }

    fn rejected(error: QueueError) -> Self {
        Self {
            inner: PendingInner::Rejected(error),
        }
    }
}

impl<R, E> Future for Pending<R, E>
where
    E: From<QueueError>,
{
    type Output = Result<R, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            PendingInner::Waiting { label, receiver } => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(QueueError::Abandoned {
                    label: label.to_string(),
                }))),
                Poll::Pending => Poll::Pending,
            },
            PendingInner::Rejected(error) => Poll::Ready(Err(E::from(error.clone()))),
        }
    }
}

impl<R, E> fmt::Debug for Pending<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            PendingInner::Waiting { label, .. } => {
                f.debug_struct("Pending").field("queue", label).finish()
            },
            PendingInner::Rejected(error) => {
                f.debug_struct("Pending").field("rejected", error).finish()
            },
        }
    }
}
