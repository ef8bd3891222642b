//! Per-key lanes.
//!
//! A lane is an unbounded mpsc queue plus one worker task draining it. The
//! worker executes envelopes strictly one at a time, so operations on a key
//! run and complete in submission order while lanes for other keys proceed
//! independently.
//!
//! ```text
//!   Director::submit        mpsc           LaneWorker (one per key)
//!   ┌──────────────────┐  ────────▶  ┌──────────────────────────────┐
//!   │ entry(key)       │             │ recv → execute → deliver     │
//!   │ lane.enqueue()   │  ◀────────  │ pending -= 1                 │
//!   └──────────────────┘   oneshot   │ retire when idle, no handle  │
//!                                    └──────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use filelane_types::FileKey;
use tokio::sync::mpsc;
use tracing::debug;

use crate::director::Director;
use crate::envelope::Envelope;
use crate::error::FilesError;

pub(crate) type LaneId = u64;

/// Create a lane: the sending half kept in the registry and the worker to spawn.
pub(crate) fn lane(id: LaneId, key: FileKey, director: Weak<Director>) -> (LaneHandle, LaneWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    let handle = LaneHandle {
        id,
        tx,
        pending: Arc::clone(&pending),
    };
    let worker = LaneWorker {
        id,
        key,
        rx,
        pending,
        director,
    };
    (handle, worker)
}

/// Registry-side half of a lane.
pub(crate) struct LaneHandle {
    id: LaneId,
    tx: mpsc::UnboundedSender<Envelope>,
    /// Envelopes submitted and not yet completed, including the one executing.
    pending: Arc<AtomicUsize>,
}

impl LaneHandle {
    pub(crate) fn id(&self) -> LaneId {
        self.id
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Append an envelope. Returns the queue depth including it, or the
    /// envelope back if the worker is gone.
    pub(crate) fn enqueue(&self, envelope: Envelope) -> Result<usize, Envelope> {
        let depth = self.pending.fetch_add(1, Ordering::AcqRel) + 1;
        match self.tx.send(envelope) {
            Ok(()) => Ok(depth),
            Err(mpsc::error::SendError(envelope)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                Err(envelope)
            }
        }
    }
}

/// Worker draining one lane.
pub(crate) struct LaneWorker {
    id: LaneId,
    key: FileKey,
    rx: mpsc::UnboundedReceiver<Envelope>,
    pending: Arc<AtomicUsize>,
    director: Weak<Director>,
}

impl LaneWorker {
    /// Run until the lane is retired or its sender is dropped.
    pub(crate) async fn run(mut self) {
        debug!(key = %self.key, lane = self.id, "lane started");

        while let Some(envelope) = self.rx.recv().await {
            // Manager dropped without shutdown: drain what's queued.
            let Some(director) = self.director.upgrade() else {
                envelope.op.reject(FilesError::ShuttingDown);
                self.pending.fetch_sub(1, Ordering::AcqRel);
                continue;
            };

            director.execute(envelope).await;
            self.pending.fetch_sub(1, Ordering::AcqRel);

            if director.retire_if_idle(&self.key, self.id) {
                break;
            }
        }

        debug!(key = %self.key, lane = self.id, "lane stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch;
    use crate::envelope::Operation;
    use filelane_types::{CaseFolding, FilePath};

    fn close_envelope(path: &str) -> (Envelope, crate::dispatch::Completion<()>) {
        let path = FilePath::parse(path).unwrap();
        let (reply, completion) = dispatch::channel();
        let envelope = Envelope::new(path.key(CaseFolding::Lowercase), path, Operation::Close { reply });
        (envelope, completion)
    }

    #[test]
    fn test_enqueue_counts_pending() {
        let key = FilePath::parse("/a").unwrap().key(CaseFolding::Lowercase);
        let (handle, _worker) = lane(1, key, Weak::new());
        assert!(handle.is_idle());

        let (envelope, _c1) = close_envelope("/a");
        assert_eq!(handle.enqueue(envelope).ok(), Some(1));
        let (envelope, _c2) = close_envelope("/a");
        assert_eq!(handle.enqueue(envelope).ok(), Some(2));
        assert_eq!(handle.pending(), 2);
        assert_eq!(handle.id(), 1);
    }

    #[test]
    fn test_enqueue_after_worker_gone() {
        let key = FilePath::parse("/a").unwrap().key(CaseFolding::Lowercase);
        let (handle, worker) = lane(1, key, Weak::new());
        drop(worker);

        let (envelope, _completion) = close_envelope("/a");
        assert!(handle.enqueue(envelope).is_err());
        assert!(handle.is_idle());
    }

    #[tokio::test]
    async fn test_orphaned_worker_rejects_queued() {
        let key = FilePath::parse("/a").unwrap().key(CaseFolding::Lowercase);
        let (handle, worker) = lane(1, key, Weak::new());

        let (envelope, completion) = close_envelope("/a");
        handle.enqueue(envelope).ok().unwrap();
        drop(handle);

        worker.run().await;
        assert!(matches!(completion.await, Err(FilesError::ShuttingDown)));
    }
}
