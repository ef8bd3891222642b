//! Completion dispatch.
//!
//! Each submitted operation gets a oneshot pair: the lane keeps the
//! [`Reply`] half, the caller gets the [`Completion`] half. A reply is
//! consumed on delivery, so every operation completes exactly once. Lanes
//! only deliver after the submitting call has returned, never inline.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::trace;

use crate::error::{FilesError, FilesResult};

/// Create a linked reply/completion pair.
pub(crate) fn channel<T>() -> (Reply<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (Reply { tx }, Completion { rx })
}

/// Lane-side half of a completion.
pub(crate) struct Reply<T> {
    tx: oneshot::Sender<FilesResult<T>>,
}

impl<T> Reply<T> {
    /// Deliver the outcome. A caller that stopped waiting is not an error.
    pub(crate) fn deliver(self, result: FilesResult<T>) {
        if self.tx.send(result).is_err() {
            trace!("completion dropped by caller; discarding result");
        }
    }
}

/// Caller-side handle to the eventual outcome of an operation.
///
/// Awaiting yields the result. Dropping it does not cancel the operation;
/// it still runs in its lane and the result is discarded.
#[must_use = "dropping a completion discards the operation's result"]
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<FilesResult<T>>,
}

impl<T> Completion<T> {
    /// A completion that is already resolved.
    pub(crate) fn ready(result: FilesResult<T>) -> Self {
        let (reply, completion) = channel();
        reply.deliver(result);
        completion
    }

    /// Take the result if the operation has completed.
    ///
    /// Returns `None` while the operation is pending. Once a result has been
    /// taken, further attempts (including awaiting) yield
    /// [`FilesError::Dropped`].
    pub fn try_take(&mut self) -> Option<FilesResult<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(FilesError::Dropped)),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = FilesResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(FilesError::Dropped)))
    }
}
