//! Open file handles.

use std::fmt;
use std::sync::Arc;

use filelane_types::{FileInfo, FileKey, FilePath, Revision};
use parking_lot::RwLock;

/// Handle to a remote file that is currently open.
///
/// Cheap to clone; clones share state. The lane owning the file refreshes the
/// revision and size after each write and marks the handle closed when the
/// file is closed, so a handle held past `close_file` reports `is_open() ==
/// false` rather than dangling.
#[derive(Clone)]
pub struct FileHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    key: FileKey,
    state: RwLock<HandleState>,
}

struct HandleState {
    info: FileInfo,
    open: bool,
}

impl FileHandle {
    pub(crate) fn new(key: FileKey, info: FileInfo) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                key,
                state: RwLock::new(HandleState { info, open: true }),
            }),
        }
    }

    pub fn key(&self) -> &FileKey {
        &self.inner.key
    }

    /// Path as the remote spells it.
    pub fn path(&self) -> FilePath {
        self.inner.state.read().info.path.clone()
    }

    pub fn revision(&self) -> Revision {
        self.inner.state.read().info.revision
    }

    pub fn size(&self) -> u64 {
        self.inner.state.read().info.size
    }

    /// Snapshot of the remote metadata.
    pub fn info(&self) -> FileInfo {
        self.inner.state.read().info.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.read().open
    }

    /// Whether both values refer to the same registration.
    pub fn same_handle(&self, other: &FileHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Record the outcome of a successful write.
    pub(crate) fn refresh(&self, revision: Revision, size: u64) {
        let mut state = self.inner.state.write();
        if revision > state.info.revision {
            state.info.revision = revision;
        }
        state.info.size = size;
    }

    pub(crate) fn mark_closed(&self) {
        self.inner.state.write().open = false;
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("FileHandle")
            .field("key", &self.inner.key)
            .field("path", &state.info.path)
            .field("revision", &state.info.revision)
            .field("size", &state.info.size)
            .field("open", &state.open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filelane_types::CaseFolding;

    fn handle(path: &str) -> FileHandle {
        let path = FilePath::parse(path).unwrap();
        let key = path.key(CaseFolding::Lowercase);
        FileHandle::new(key, FileInfo::new(path, Revision::new(3), 10))
    }

    #[test]
    fn test_clones_share_state() {
        let a = handle("/Notes/A.txt");
        let b = a.clone();
        assert!(a.same_handle(&b));
        assert!(!a.same_handle(&handle("/Notes/A.txt")));

        a.refresh(Revision::new(4), 2);
        assert_eq!(b.revision(), Revision::new(4));
        assert_eq!(b.size(), 2);

        b.mark_closed();
        assert!(!a.is_open());
    }

    #[test]
    fn test_revision_never_moves_back() {
        let h = handle("/a.txt");
        h.refresh(Revision::new(1), 5);
        assert_eq!(h.revision(), Revision::new(3));
        assert_eq!(h.size(), 5);
    }

    #[test]
    fn test_key_and_path() {
        let h = handle("/Notes/A.txt");
        assert_eq!(h.key().as_str(), "/notes/a.txt");
        assert_eq!(h.path().as_str(), "/Notes/A.txt");
        assert!(h.is_open());
        assert!(format!("{h:?}").contains("open: true"));
    }
}
