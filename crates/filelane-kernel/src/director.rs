//! Queue director.
//!
//! Routes envelopes to the lane for their key (creating it on first use),
//! executes them on behalf of the lane workers, and retires lanes that have
//! gone idle with no open handle.
//!
//! Operation rules, all evaluated when the envelope executes rather than
//! when it is submitted:
//!
//! | Operation     | Handle registered            | No handle                     |
//! |---------------|------------------------------|-------------------------------|
//! | create        | `AlreadyExists`              | remote create, register       |
//! | open          | existing handle, no remote   | remote open, register         |
//! | read / write  | remote call                  | `NotOpen`                     |
//! | close         | unregister, success          | success                       |
//! | create folder | remote call                  | remote call                   |

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use filelane_types::{CaseFolding, FileKey, FilePath, OpKind};
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::config::FilesConfig;
use crate::dispatch::{self, Reply};
use crate::envelope::{Envelope, Operation};
use crate::error::{FilesError, FilesResult};
use crate::handle::FileHandle;
use crate::lane::{self, LaneHandle, LaneId};
use crate::registry::{Registry, Slot};
use crate::store::{RemoteStore, StoreResult};

pub(crate) struct Director {
    store: Arc<dyn RemoteStore>,
    registry: Registry,
    config: FilesConfig,
    folding: CaseFolding,
    runtime: Handle,
    tracker: TaskTracker,
    next_lane_id: AtomicU64,
    shutting_down: AtomicBool,
}

impl Director {
    pub(crate) fn new(store: Arc<dyn RemoteStore>, config: FilesConfig, runtime: Handle) -> Self {
        let store_folding = store.case_folding();
        let folding = match config.case_folding {
            Some(forced) if forced != store_folding => {
                warn!(
                    ?forced,
                    store = ?store_folding,
                    "case folding differs from the store's; keys may not match remote files"
                );
                forced
            }
            Some(forced) => forced,
            None => store_folding,
        };
        debug!(?folding, "files manager case folding");

        Self {
            store,
            registry: Registry::new(),
            config,
            folding,
            runtime,
            tracker: TaskTracker::new(),
            next_lane_id: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub(crate) fn config(&self) -> &FilesConfig {
        &self.config
    }

    /// Folding in effect: the config's override or the store's own.
    pub(crate) fn folding(&self) -> CaseFolding {
        self.folding
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Append an envelope to its key's lane. Never blocks on execution.
    ///
    /// The shutdown flag is checked under the key's entry lock, the same lock
    /// `shutdown` passes through when it enqueues the final closes. A
    /// submission either lands ahead of that close or is rejected.
    pub(crate) fn submit(self: &Arc<Self>, envelope: Envelope) {
        let key = envelope.key.clone();
        let kind = envelope.kind();

        let queued = match self.registry.entry(key.clone()) {
            _ if !envelope.internal && self.is_shutting_down() => {
                Err((envelope, FilesError::ShuttingDown))
            }
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                match slot.lane.enqueue(envelope) {
                    Ok(depth) => Ok(depth),
                    Err(envelope) => {
                        warn!(key = %key, lane = slot.lane.id(), "lane worker gone; replacing lane");
                        slot.lane = self.spawn_lane(&key);
                        slot.lane.enqueue(envelope).map_err(|e| (e, FilesError::Dropped))
                    }
                }
            }
            Entry::Vacant(entry) => {
                let slot = entry.insert(Slot::new(envelope.path.clone(), self.spawn_lane(&key)));
                slot.lane.enqueue(envelope).map_err(|e| (e, FilesError::Dropped))
            }
        };

        match queued {
            Ok(depth) if depth >= self.config.queue_depth_warn => {
                warn!(key = %key, op = %kind, depth, "lane queue is deep");
            }
            Ok(depth) => trace!(key = %key, op = %kind, depth, "queued"),
            Err((envelope, FilesError::ShuttingDown)) => {
                debug!(key = %key, op = %kind, "rejected: shutting down");
                envelope.op.reject(FilesError::ShuttingDown);
            }
            Err((envelope, err)) => {
                warn!(key = %key, op = %kind, "runtime unavailable; operation dropped");
                envelope.op.reject(err);
            }
        }
    }

    fn spawn_lane(self: &Arc<Self>, key: &FileKey) -> LaneHandle {
        let id = self.next_lane_id.fetch_add(1, Ordering::Relaxed);
        let (handle, worker) = lane::lane(id, key.clone(), Arc::downgrade(self));
        self.tracker.spawn_on(worker.run(), &self.runtime);
        debug!(key = %key, lane = id, "lane created");
        handle
    }

    /// Remove the key's slot if `lane_id` still owns it, nothing is queued,
    /// and no handle is registered. While shutting down an open handle does
    /// not keep the lane alive.
    ///
    /// Returns `true` if the lane was retired; the caller's worker must stop.
    pub(crate) fn retire_if_idle(&self, key: &FileKey, lane_id: LaneId) -> bool {
        let force = self.is_shutting_down();
        let removed = self.registry.remove_if(key, |_, slot| {
            slot.lane.id() == lane_id && slot.lane.is_idle() && (force || slot.handle.is_none())
        });

        match removed {
            Some((_, slot)) => {
                if let Some(handle) = slot.handle {
                    handle.mark_closed();
                }
                debug!(key = %key, lane = lane_id, "lane retired");
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute one envelope and deliver its completion.
    pub(crate) async fn execute(&self, envelope: Envelope) {
        let Envelope {
            key,
            path,
            op,
            submitted,
            ..
        } = envelope;
        let kind = op.kind();
        trace!(
            key = %key,
            op = %kind,
            waited_ms = submitted.elapsed().as_millis() as u64,
            "executing"
        );

        match op {
            Operation::Create { reply } => {
                let result = self.create(&key, &path).await;
                settle(kind, &path, reply, result);
            }
            Operation::CreateFolder { reply } => {
                let result = self
                    .remote(kind, &path, self.store.create_folder(&path))
                    .await;
                settle(kind, &path, reply, result);
            }
            Operation::Open { reply } => {
                let result = self.open(&key, &path).await;
                settle(kind, &path, reply, result);
            }
            Operation::Read { reply } => {
                let result = self.read(&key, &path).await;
                settle(kind, &path, reply, result);
            }
            Operation::ReadString { reply } => {
                let result = self.read(&key, &path).await.and_then(|bytes| {
                    String::from_utf8(bytes).map_err(|source| FilesError::InvalidUtf8 {
                        path: path.clone(),
                        source,
                    })
                });
                settle(kind, &path, reply, result);
            }
            Operation::Write { data, reply } => {
                let result = self.write(&key, &path, &data).await;
                settle(kind, &path, reply, result);
            }
            Operation::Close { reply } => {
                if let Some(handle) = self.registry.unregister(&key) {
                    handle.mark_closed();
                    debug!(key = %key, "file closed");
                }
                settle(kind, &path, reply, Ok(()));
            }
        }
    }

    async fn create(&self, key: &FileKey, path: &FilePath) -> FilesResult<FileHandle> {
        if self.registry.lookup(key).is_some() {
            return Err(FilesError::AlreadyExists(path.clone()));
        }
        let info = self
            .remote(OpKind::Create, path, self.store.create_file(path))
            .await?;
        let handle = FileHandle::new(key.clone(), info);
        self.registry.register(key, handle.clone());
        Ok(handle)
    }

    async fn open(&self, key: &FileKey, path: &FilePath) -> FilesResult<FileHandle> {
        if let Some(handle) = self.registry.lookup(key) {
            trace!(key = %key, "already open; reusing handle");
            return Ok(handle);
        }
        let info = self
            .remote(OpKind::Open, path, self.store.open_file(path))
            .await?;
        let handle = FileHandle::new(key.clone(), info);
        self.registry.register(key, handle.clone());
        Ok(handle)
    }

    // Remote calls go to the spelling the handle was opened with; the
    // caller's spelling only has to fold to the same key.
    async fn read(&self, key: &FileKey, path: &FilePath) -> FilesResult<Vec<u8>> {
        let remote_path = self.require_open(key, path)?.path();
        self.remote(OpKind::Read, &remote_path, self.store.read_bytes(&remote_path))
            .await
    }

    async fn write(&self, key: &FileKey, path: &FilePath, data: &[u8]) -> FilesResult<FileHandle> {
        let handle = self.require_open(key, path)?;
        let remote_path = handle.path();
        let revision = self
            .remote(OpKind::Write, &remote_path, self.store.write_bytes(&remote_path, data))
            .await?;
        handle.refresh(revision, data.len() as u64);
        Ok(handle)
    }

    fn require_open(&self, key: &FileKey, path: &FilePath) -> FilesResult<FileHandle> {
        self.registry
            .lookup(key)
            .ok_or_else(|| FilesError::NotOpen(path.clone()))
    }

    /// Await a remote call, logging it if slow, and map its error.
    async fn remote<T>(
        &self,
        kind: OpKind,
        path: &FilePath,
        call: impl Future<Output = StoreResult<T>>,
    ) -> FilesResult<T> {
        let started = Instant::now();
        let result = call.await;
        let elapsed = started.elapsed();
        if elapsed >= self.config.slow_op_threshold() {
            warn!(
                path = %path,
                op = %kind,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow remote call"
            );
        }
        result.map_err(|e| FilesError::from_store(path, e))
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Close every open file and wait for all lanes to drain and retire.
    pub(crate) async fn shutdown(self: &Arc<Self>) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            debug!("shutdown already in progress");
        } else {
            info!(
                lanes = self.registry.lane_count(),
                open_files = self.registry.open_count(),
                "shutting down files manager"
            );
        }

        for (key, path) in self.registry.lanes() {
            let (reply, _completion) = dispatch::channel::<()>();
            self.submit(Envelope::new(key, path, Operation::Close { reply }).internal());
        }

        self.tracker.close();
        self.tracker.wait().await;
        info!("files manager stopped");
    }
}

fn settle<T>(kind: OpKind, path: &FilePath, reply: Reply<T>, result: FilesResult<T>) {
    match &result {
        Ok(_) => trace!(path = %path, op = %kind, "completed"),
        Err(err) => debug!(path = %path, op = %kind, error = %err, "failed"),
    }
    reply.deliver(result);
}
