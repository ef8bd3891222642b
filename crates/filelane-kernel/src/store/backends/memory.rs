//! In-memory remote store.
//!
//! Used for testing and for running the kernel without a network. Paths are
//! case-insensitive, like the hosted stores this stands in for. All data is
//! ephemeral.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use filelane_types::{CaseFolding, FileInfo, FileKey, FilePath, Revision};

use crate::store::error::{StoreError, StoreResult};
use crate::store::ops::RemoteStore;

/// Entry in the memory store.
#[derive(Debug, Clone)]
enum Entry {
    File {
        /// Spelling used when the file was created.
        path: FilePath,
        data: Vec<u8>,
        revision: Revision,
    },
    Folder {
        path: FilePath,
    },
}

/// In-memory remote store.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<HashMap<FileKey, Entry>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty store. The root folder always exists.
    pub fn new() -> Self {
        let root = FilePath::root();
        let mut entries = HashMap::new();
        entries.insert(Self::key(&root), Entry::Folder { path: root });
        Self {
            entries: RwLock::new(entries),
        }
    }

    fn key(path: &FilePath) -> FileKey {
        path.key(CaseFolding::Lowercase)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<FileKey, Entry>>> {
        self.entries
            .read()
            .map_err(|_| StoreError::other("lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<FileKey, Entry>>> {
        self.entries
            .write()
            .map_err(|_| StoreError::other("lock poisoned"))
    }

    /// Ensure all parent folders exist.
    fn ensure_parents(entries: &mut HashMap<FileKey, Entry>, path: &FilePath) -> StoreResult<()> {
        let mut ancestors: Vec<FilePath> = path.ancestors().collect();
        ancestors.reverse();
        for folder in ancestors {
            match entries.get(&Self::key(&folder)) {
                Some(Entry::Folder { .. }) => {}
                Some(Entry::File { .. }) => {
                    return Err(StoreError::not_a_folder(folder.to_string()));
                }
                None => {
                    entries.insert(Self::key(&folder), Entry::Folder { path: folder });
                }
            }
        }
        Ok(())
    }

    /// Put a file's content directly, bypassing create/open.
    ///
    /// Simulates an edit made elsewhere (another device). Creates the file
    /// and its parents if needed, and bumps the revision.
    pub fn put_file(&self, path: &FilePath, data: impl Into<Vec<u8>>) -> StoreResult<Revision> {
        let mut entries = self.write()?;
        Self::ensure_parents(&mut entries, path)?;
        let key = Self::key(path);
        match entries.get_mut(&key) {
            Some(Entry::File {
                data: file_data,
                revision,
                ..
            }) => {
                *file_data = data.into();
                *revision = revision.next();
                Ok(*revision)
            }
            Some(Entry::Folder { .. }) => Err(StoreError::is_a_folder(path.to_string())),
            None => {
                let revision = Revision::INITIAL.next();
                entries.insert(
                    key,
                    Entry::File {
                        path: path.clone(),
                        data: data.into(),
                        revision,
                    },
                );
                Ok(revision)
            }
        }
    }

    /// Remove an entry directly, as if deleted remotely.
    ///
    /// Returns `true` if something was removed.
    pub fn remove(&self, path: &FilePath) -> StoreResult<bool> {
        if path.is_root() {
            return Err(StoreError::other("cannot remove root"));
        }
        let mut entries = self.write()?;
        Ok(entries.remove(&Self::key(path)).is_some())
    }

    /// Current content of a file, if it exists.
    pub fn file_contents(&self, path: &FilePath) -> Option<Vec<u8>> {
        let entries = self.read().ok()?;
        match entries.get(&Self::key(path)) {
            Some(Entry::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Whether a folder exists at the path.
    pub fn is_folder(&self, path: &FilePath) -> bool {
        self.read()
            .map(|entries| matches!(entries.get(&Self::key(path)), Some(Entry::Folder { .. })))
            .unwrap_or(false)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn case_folding(&self) -> CaseFolding {
        CaseFolding::Lowercase
    }

    async fn create_file(&self, path: &FilePath) -> StoreResult<FileInfo> {
        let mut entries = self.write()?;
        Self::ensure_parents(&mut entries, path)?;

        let key = Self::key(path);
        if entries.contains_key(&key) {
            return Err(StoreError::already_exists(path.to_string()));
        }

        entries.insert(
            key,
            Entry::File {
                path: path.clone(),
                data: Vec::new(),
                revision: Revision::INITIAL,
            },
        );
        Ok(FileInfo::new(path.clone(), Revision::INITIAL, 0))
    }

    async fn open_file(&self, path: &FilePath) -> StoreResult<FileInfo> {
        let entries = self.read()?;
        match entries.get(&Self::key(path)) {
            Some(Entry::File {
                path,
                data,
                revision,
            }) => Ok(FileInfo::new(path.clone(), *revision, data.len() as u64)),
            Some(Entry::Folder { .. }) => Err(StoreError::is_a_folder(path.to_string())),
            None => Err(StoreError::not_found(path.to_string())),
        }
    }

    async fn read_bytes(&self, path: &FilePath) -> StoreResult<Vec<u8>> {
        let entries = self.read()?;
        match entries.get(&Self::key(path)) {
            Some(Entry::File { data, .. }) => Ok(data.clone()),
            Some(Entry::Folder { .. }) => Err(StoreError::is_a_folder(path.to_string())),
            None => Err(StoreError::not_found(path.to_string())),
        }
    }

    async fn write_bytes(&self, path: &FilePath, data: &[u8]) -> StoreResult<Revision> {
        let mut entries = self.write()?;
        match entries.get_mut(&Self::key(path)) {
            Some(Entry::File {
                data: file_data,
                revision,
                ..
            }) => {
                file_data.clear();
                file_data.extend_from_slice(data);
                *revision = revision.next();
                Ok(*revision)
            }
            Some(Entry::Folder { .. }) => Err(StoreError::is_a_folder(path.to_string())),
            None => Err(StoreError::not_found(path.to_string())),
        }
    }

    async fn create_folder(&self, path: &FilePath) -> StoreResult<FilePath> {
        let mut entries = self.write()?;
        Self::ensure_parents(&mut entries, path)?;

        let key = Self::key(path);
        match entries.get(&key) {
            Some(Entry::Folder { path }) => Ok(path.clone()),
            Some(Entry::File { .. }) => Err(StoreError::already_exists(path.to_string())),
            None => {
                entries.insert(key, Entry::Folder { path: path.clone() });
                Ok(path.clone())
            }
        }
    }
}
