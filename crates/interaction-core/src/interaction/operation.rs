//! Completion handles for asynchronous interaction operations

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::{InteractionError, InteractionResult};

/// Outcome of an asynchronous operation such as hold, unhold or DTMF
///
/// Resolves exactly once: with the operation's result, with
/// [`InteractionError::Timeout`] if the far end never answered, or with
/// [`InteractionError::Cancelled`] if the interaction was torn down first.
/// Dropping the handle does not cancel the operation.
#[derive(Debug)]
#[must_use = "the operation runs regardless, but its outcome is only observable by awaiting this"]
pub struct PendingOperation {
    operation: &'static str,
    rx: oneshot::Receiver<InteractionResult<()>>,
}

/// Sending half held by the command worker
#[derive(Debug)]
pub(crate) struct Completion {
    operation: &'static str,
    tx: oneshot::Sender<InteractionResult<()>>,
}

impl PendingOperation {
    pub(crate) fn new(operation: &'static str) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (Self { operation, rx }, Completion { operation, tx })
    }

    /// Name of the operation this handle tracks
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Future for PendingOperation {
    type Output = InteractionResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        self.rx.poll_unpin(cx).map(|received| {
            // Sender dropped without answering: the worker is gone
            received.unwrap_or(Err(InteractionError::Cancelled { operation }))
        })
    }
}

impl Completion {
    pub(crate) fn operation(&self) -> &'static str {
        self.operation
    }

    /// Resolve the pending operation; a dropped handle is ignored
    pub(crate) fn complete(self, result: InteractionResult<()>) {
        let _ = self.tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_resolves_with_sent_result() {
        let (op, completion) = PendingOperation::new("hold");
        let mut op = task::spawn(op);
        assert_pending!(op.poll());

        completion.complete(Ok(()));
        assert!(op.is_woken());
        assert_eq!(assert_ready!(op.poll()), Ok(()));
    }

    #[test]
    fn test_dropped_completion_resolves_as_cancelled() {
        let (op, completion) = PendingOperation::new("send_dtmf");
        assert_eq!(completion.operation(), "send_dtmf");
        drop(completion);

        let mut op = task::spawn(op);
        assert_eq!(
            assert_ready!(op.poll()),
            Err(InteractionError::Cancelled { operation: "send_dtmf" })
        );
    }
}
