//! A single queued call.

use tokio::sync::oneshot;
use tracing::debug;

/// Arguments of one call paired with the channel its outcome goes back on.
///
/// Completing an envelope consumes it, so every envelope is answered at most
/// once. The dispatcher answers every envelope it receives.
#[derive(Debug)]
pub struct Envelope<A, R, E> {
    /// Call arguments, cloned for every attempt
    pub args: A,
    reply: oneshot::Sender<Result<R, E>>,
}

impl<A, R, E> Envelope<A, R, E> {
    /// Pair `args` with a fresh reply channel
    pub fn new(args: A) -> (Self, oneshot::Receiver<Result<R, E>>) {
        let (reply, receiver) = oneshot::channel();
        (Self { args, reply }, receiver)
    }

    /// Deliver the final outcome to the caller.
    ///
    /// Returns `false` if the caller stopped waiting.
    pub fn complete(self, outcome: Result<R, E>) -> bool {
        if self.reply.send(outcome).is_err() {
            debug!("Caller dropped its pending result before completion");
            return false;
        }
        true
    }

    /// Whether the caller still waits on this envelope
    pub fn is_awaited(&self) -> bool {
        !self.reply.is_closed()
    }
}
