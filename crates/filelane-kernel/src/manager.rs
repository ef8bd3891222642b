//! Public entry point.

use std::sync::Arc;

use filelane_types::{CaseFolding, FileKey, FilePath, IntoFilePath};
use tokio::runtime::Handle;

use crate::config::FilesConfig;
use crate::director::Director;
use crate::dispatch::{self, Completion, Reply};
use crate::envelope::{Envelope, Operation};
use crate::handle::FileHandle;
use crate::store::RemoteStore;

/// Snapshot of manager activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Keys with a live lane.
    pub lanes: usize,
    /// Keys with a registered handle.
    pub open_files: usize,
    /// Operations submitted and not yet completed.
    pub pending_ops: usize,
}

/// Serializes file operations per key over a [`RemoteStore`].
///
/// Operations accept a [`FilePath`] or a string; a string that does not
/// parse completes with [`FilesError::InvalidPath`](crate::FilesError::InvalidPath).
///
/// Operations on the same key (see [`FilePath::key`]) execute and complete
/// in submission order; operations on different keys run concurrently.
/// Submitting never blocks: each call returns a [`Completion`] that resolves
/// once the operation has run in its lane.
///
/// Cheap to clone; clones share the same lanes and registry. Dropping the
/// last clone without calling [`shutdown`](Self::shutdown) lets lanes drain,
/// but operations still queued complete with
/// [`FilesError::ShuttingDown`](crate::FilesError::ShuttingDown).
#[derive(Clone)]
pub struct FilesManager {
    director: Arc<Director>,
}

impl FilesManager {
    /// Create a manager with default configuration on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_config(store, FilesConfig::default())
    }

    /// Create a manager on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_config(store: Arc<dyn RemoteStore>, config: FilesConfig) -> Self {
        Self::with_runtime(store, config, Handle::current())
    }

    /// Create a manager whose lanes run on the given runtime.
    pub fn with_runtime(store: Arc<dyn RemoteStore>, config: FilesConfig, runtime: Handle) -> Self {
        Self {
            director: Arc::new(Director::new(store, config, runtime)),
        }
    }

    pub fn config(&self) -> &FilesConfig {
        self.director.config()
    }

    /// Case folding in effect: the configured override, else the store's.
    pub fn case_folding(&self) -> CaseFolding {
        self.director.folding()
    }

    /// The key operations on `path` are serialized under.
    pub fn key_for(&self, path: &FilePath) -> FileKey {
        path.key(self.case_folding())
    }

    fn submit<T>(&self, path: impl IntoFilePath, op: impl FnOnce(Reply<T>) -> Operation) -> Completion<T> {
        let path = match path.into_file_path() {
            Ok(path) => path,
            Err(err) => return Completion::ready(Err(err.into())),
        };
        let (reply, completion) = dispatch::channel();
        let envelope = Envelope::new(self.key_for(&path), path, op(reply));
        self.director.submit(envelope);
        completion
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create a new remote file and open it.
    ///
    /// Fails with `AlreadyExists` if the file is open in this manager, and
    /// with `Remote` if the remote already has it.
    pub fn create_file(&self, path: impl IntoFilePath) -> Completion<FileHandle> {
        self.submit(path, |reply| Operation::Create { reply })
    }

    /// Create a remote folder (and any missing parents).
    ///
    /// Serialized with other operations on the same path; never registers a
    /// handle. Resolves to the folder's path as the remote spells it.
    pub fn create_folder(&self, path: impl IntoFilePath) -> Completion<FilePath> {
        self.submit(path, |reply| Operation::CreateFolder { reply })
    }

    /// Open an existing remote file.
    ///
    /// If the file is already open when this operation executes, the
    /// registered handle is returned without contacting the remote.
    pub fn open_file(&self, path: impl IntoFilePath) -> Completion<FileHandle> {
        self.submit(path, |reply| Operation::Open { reply })
    }

    /// The handle currently registered for `path`, if any.
    ///
    /// A direct registry read: it does not wait for queued operations, so it
    /// reflects only operations that have already executed. A path that does
    /// not parse has no handle.
    pub fn file_for_path(&self, path: impl IntoFilePath) -> Option<FileHandle> {
        let path = path.into_file_path().ok()?;
        self.director.registry().lookup(&self.key_for(&path))
    }

    /// Read the whole file. Requires the file to be open.
    pub fn read_data(&self, path: impl IntoFilePath) -> Completion<Vec<u8>> {
        self.submit(path, |reply| Operation::Read { reply })
    }

    /// Read the whole file as UTF-8 text. Requires the file to be open.
    pub fn read_string(&self, path: impl IntoFilePath) -> Completion<String> {
        self.submit(path, |reply| Operation::ReadString { reply })
    }

    /// Replace the file's content with `content`. Requires the file to be open.
    pub fn write_string(&self, content: impl Into<String>, path: impl IntoFilePath) -> Completion<FileHandle> {
        self.write_data(content.into().into_bytes(), path)
    }

    /// Replace the file's content with raw bytes. Requires the file to be open.
    pub fn write_data(&self, data: impl Into<Vec<u8>>, path: impl IntoFilePath) -> Completion<FileHandle> {
        let data = data.into();
        self.submit(path, |reply| Operation::Write { data, reply })
    }

    /// Close the file. Succeeds whether or not it was open.
    pub fn close_file(&self, path: impl IntoFilePath) -> Completion<()> {
        self.submit(path, |reply| Operation::Close { reply })
    }

    // ========================================================================
    // Introspection and lifecycle
    // ========================================================================

    /// Paths of all open files, as the remote spells them.
    pub fn open_paths(&self) -> Vec<FilePath> {
        let mut paths: Vec<FilePath> = self
            .director
            .registry()
            .open_handles()
            .iter()
            .map(FileHandle::path)
            .collect();
        paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        paths
    }

    pub fn stats(&self) -> ManagerStats {
        let registry = self.director.registry();
        ManagerStats {
            lanes: registry.lane_count(),
            open_files: registry.open_count(),
            pending_ops: registry.pending_ops(),
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.director.is_shutting_down()
    }

    /// Stop accepting operations, close every open file after the work
    /// already queued for it, and wait until all lanes have retired.
    ///
    /// Operations submitted afterwards complete with `ShuttingDown`.
    pub async fn shutdown(&self) {
        self.director.shutdown().await;
    }
}

impl std::fmt::Debug for FilesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesManager")
            .field("config", self.config())
            .field("stats", &self.stats())
            .finish()
    }
}
