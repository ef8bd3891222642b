//! Shared test fixtures: a store wrapper that records calls and can hold
//! calls on chosen paths until released.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use filelane_kernel::{
    CaseFolding, FileInfo, FilePath, FilesManager, MemoryStore, RemoteStore, Revision, StoreError,
    StoreResult,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn p(s: &str) -> FilePath {
    FilePath::parse(s).unwrap()
}

/// [`MemoryStore`] wrapper with a call log and per-path gates.
///
/// Each call is logged as `"<op> <path>"` when it starts. A held path blocks
/// every call on it until released.
#[derive(Default)]
pub struct ScriptedStore {
    inner: MemoryStore,
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, watch::Sender<bool>>>,
    failing_writes: Mutex<HashSet<String>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Block calls on `path` until [`release`](Self::release).
    pub fn hold(&self, path: &str) {
        let (tx, _rx) = watch::channel(false);
        self.gates.lock().insert(path.to_string(), tx);
    }

    pub fn release(&self, path: &str) {
        if let Some(tx) = self.gates.lock().remove(path) {
            let _ = tx.send(true);
        }
    }

    /// Make writes to `path` fail with a conflict.
    pub fn fail_writes(&self, path: &str) {
        self.failing_writes.lock().insert(path.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<String> {
        let prefix = format!("{op} ");
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(&prefix))
            .collect()
    }

    async fn enter(&self, op: &str, path: &FilePath) {
        self.calls.lock().push(format!("{op} {path}"));
        let gate = self.gates.lock().get(path.as_str()).map(|tx| tx.subscribe());
        if let Some(mut rx) = gate {
            let _ = rx.wait_for(|open| *open).await;
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    fn case_folding(&self) -> CaseFolding {
        self.inner.case_folding()
    }

    async fn create_file(&self, path: &FilePath) -> StoreResult<FileInfo> {
        self.enter("create", path).await;
        self.inner.create_file(path).await
    }

    async fn open_file(&self, path: &FilePath) -> StoreResult<FileInfo> {
        self.enter("open", path).await;
        self.inner.open_file(path).await
    }

    async fn read_bytes(&self, path: &FilePath) -> StoreResult<Vec<u8>> {
        self.enter("read", path).await;
        self.inner.read_bytes(path).await
    }

    async fn write_bytes(&self, path: &FilePath, data: &[u8]) -> StoreResult<Revision> {
        self.enter("write", path).await;
        if self.failing_writes.lock().contains(path.as_str()) {
            return Err(StoreError::conflict(path.to_string()));
        }
        self.inner.write_bytes(path, data).await
    }

    async fn create_folder(&self, path: &FilePath) -> StoreResult<FilePath> {
        self.enter("create_folder", path).await;
        self.inner.create_folder(path).await
    }
}

pub fn setup() -> (Arc<ScriptedStore>, FilesManager) {
    init_tracing();
    let store = ScriptedStore::new();
    let files = FilesManager::new(store.clone());
    (store, files)
}

/// Wait until every lane has retired.
pub async fn wait_until_retired(files: &FilesManager) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while files.stats().lanes > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("lanes did not retire");
}
