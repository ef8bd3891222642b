//! Local directory store.
//!
//! Treats a directory on disk as the remote, e.g. the folder a sync client
//! mirrors. Path security prevents escaping the root directory.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::debug;

use filelane_types::{CaseFolding, FileInfo, FilePath, Revision};

use crate::store::error::{StoreError, StoreResult};
use crate::store::ops::RemoteStore;

/// Directory-backed store.
///
/// All paths are relative to `root`: with root `/home/amy/Dropbox`,
/// `/notes/a.txt` is `/home/amy/Dropbox/notes/a.txt`.
///
/// Revisions are derived from modification times, so they never move
/// backward but two writes inside the filesystem's timestamp granularity may
/// report the same revision.
///
/// Case handling follows the filesystem under the root, checked once at
/// construction: case-sensitive filesystems (the usual Linux setup) report
/// [`CaseFolding::Preserve`], case-insensitive ones (macOS, Windows)
/// [`CaseFolding::Lowercase`].
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    case_folding: CaseFolding,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);
        let case_folding = Self::detect_case_folding(&root);
        Self { root, case_folding }
    }

    /// Override the detected case handling.
    pub fn with_case_folding(mut self, folding: CaseFolding) -> Self {
        self.case_folding = folding;
        self
    }

    /// Create a mixed-case marker file and look it up in lowercase.
    ///
    /// Anything that prevents the check reports `Preserve`.
    fn detect_case_folding(root: &Path) -> CaseFolding {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let name = format!(
            ".Filelane-CaseCheck-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let marker = root.join(&name);

        if let Err(e) = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&marker)
        {
            debug!(root = %root.display(), error = %e, "case check failed; assuming case-sensitive");
            return CaseFolding::Preserve;
        }
        let folds = root.join(name.to_lowercase()).exists();
        let _ = std::fs::remove_file(&marker);

        let folding = if folds {
            CaseFolding::Lowercase
        } else {
            CaseFolding::Preserve
        };
        debug!(root = %root.display(), ?folding, "detected case handling");
        folding
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path to a location under the root.
    ///
    /// The deepest existing ancestor is canonicalized so a symlink inside the
    /// root cannot lead outside it.
    fn resolve(&self, path: &FilePath) -> StoreResult<PathBuf> {
        let relative = path.as_str().trim_start_matches('/');
        if relative.is_empty() {
            return Ok(self.root.clone());
        }

        let full = self.root.join(relative);
        let mut existing = full.as_path();
        let mut missing: Vec<OsString> = Vec::new();
        while !existing.exists() {
            let name = existing
                .file_name()
                .ok_or_else(|| StoreError::other(format!("cannot resolve {path}")))?;
            missing.push(name.to_os_string());
            existing = existing
                .parent()
                .ok_or_else(|| StoreError::other(format!("cannot resolve {path}")))?;
        }

        let mut canonical = existing.canonicalize()?;
        for name in missing.iter().rev() {
            canonical.push(name);
        }

        if !canonical.starts_with(&self.root) {
            return Err(StoreError::path_escapes_root(format!(
                "{} is not under {}",
                canonical.display(),
                self.root.display()
            )));
        }
        Ok(canonical)
    }

    fn revision_of(meta: &std::fs::Metadata) -> Revision {
        let nanos = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Revision::new(nanos)
    }

    /// Translate an I/O error into the store's vocabulary for `path`.
    fn map_io(e: io::Error, path: &FilePath) -> StoreError {
        match e.kind() {
            io::ErrorKind::NotFound => StoreError::not_found(path.to_string()),
            io::ErrorKind::AlreadyExists => StoreError::already_exists(path.to_string()),
            _ => StoreError::Io(e),
        }
    }

    /// Metadata for a path that must be a regular file.
    async fn file_metadata(&self, full: &Path, path: &FilePath) -> StoreResult<std::fs::Metadata> {
        let meta = fs::metadata(full).await.map_err(|e| Self::map_io(e, path))?;
        if meta.is_dir() {
            return Err(StoreError::is_a_folder(path.to_string()));
        }
        Ok(meta)
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    fn case_folding(&self) -> CaseFolding {
        self.case_folding
    }

    async fn create_file(&self, path: &FilePath) -> StoreResult<FileInfo> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory => {
                        StoreError::not_a_folder(path.to_string())
                    }
                    _ => StoreError::Io(e),
                })?;
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| Self::map_io(e, path))?;
        let meta = file.metadata().await?;
        Ok(FileInfo::new(path.clone(), Self::revision_of(&meta), meta.len()))
    }

    async fn open_file(&self, path: &FilePath) -> StoreResult<FileInfo> {
        let full = self.resolve(path)?;
        let meta = self.file_metadata(&full, path).await?;
        Ok(FileInfo::new(path.clone(), Self::revision_of(&meta), meta.len()))
    }

    async fn read_bytes(&self, path: &FilePath) -> StoreResult<Vec<u8>> {
        let full = self.resolve(path)?;
        self.file_metadata(&full, path).await?;
        fs::read(&full).await.map_err(|e| Self::map_io(e, path))
    }

    async fn write_bytes(&self, path: &FilePath, data: &[u8]) -> StoreResult<Revision> {
        let full = self.resolve(path)?;
        // Whole-file replace of an existing file only; creation goes through create_file.
        self.file_metadata(&full, path).await?;
        fs::write(&full, data)
            .await
            .map_err(|e| Self::map_io(e, path))?;
        let meta = fs::metadata(&full).await?;
        Ok(Self::revision_of(&meta))
    }

    async fn create_folder(&self, path: &FilePath) -> StoreResult<FilePath> {
        let full = self.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => return Ok(path.clone()),
            Ok(_) => return Err(StoreError::already_exists(path.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e)),
        }
        fs::create_dir_all(&full)
            .await
            .map_err(|e| Self::map_io(e, path))?;
        Ok(path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn p(s: &str) -> FilePath {
        FilePath::parse(s).unwrap()
    }

    fn setup() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_write_read() {
        let (dir, store) = setup();
        let info = store.create_file(&p("/notes/a.txt")).await.unwrap();
        assert_eq!(info.size, 0);
        assert!(dir.path().join("notes").is_dir());

        let rev = store.write_bytes(&p("/notes/a.txt"), b"hello").await.unwrap();
        assert!(rev >= info.revision);
        assert_eq!(store.read_bytes(&p("/notes/a.txt")).await.unwrap(), b"hello");

        let info = store.open_file(&p("/notes/a.txt")).await.unwrap();
        assert_eq!(info.size, 5);
    }

    #[tokio::test]
    async fn test_create_existing_fails() {
        let (_dir, store) = setup();
        store.create_file(&p("/a.txt")).await.unwrap();
        let err = store.create_file(&p("/a.txt")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_missing_paths() {
        let (_dir, store) = setup();
        assert!(store.open_file(&p("/nope.txt")).await.unwrap_err().is_not_found());
        assert!(store.read_bytes(&p("/nope.txt")).await.unwrap_err().is_not_found());
        assert!(store.write_bytes(&p("/nope.txt"), b"x").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_folders() {
        let (dir, store) = setup();
        assert_eq!(store.create_folder(&p("/a/b")).await.unwrap(), p("/a/b"));
        assert!(dir.path().join("a/b").is_dir());
        // Idempotent
        store.create_folder(&p("/a/b")).await.unwrap();

        let err = store.open_file(&p("/a")).await.unwrap_err();
        assert!(matches!(err, StoreError::IsAFolder(_)));
    }

    #[test]
    fn test_case_folding_detection() {
        let (dir, store) = setup();
        // The marker file is cleaned up.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        std::fs::write(dir.path().join("Mixed.txt"), "x").unwrap();
        let folds = dir.path().join("mixed.txt").exists();
        let expected = if folds {
            CaseFolding::Lowercase
        } else {
            CaseFolding::Preserve
        };
        assert_eq!(store.case_folding(), expected);

        let store = store.with_case_folding(CaseFolding::Lowercase);
        assert_eq!(store.case_folding(), CaseFolding::Lowercase);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_tempdir_is_case_sensitive() {
        let (_dir, store) = setup();
        assert_eq!(store.case_folding(), CaseFolding::Preserve);
    }

    #[test]
    fn test_missing_root_assumes_case_sensitive() {
        let store = LocalStore::new("/definitely/not/a/root");
        assert_eq!(store.case_folding(), CaseFolding::Preserve);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let (dir, store) = setup();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let err = store.create_file(&p("/link/evil.txt")).await.unwrap_err();
        assert!(matches!(err, StoreError::PathEscapesRoot(_)));
        assert!(!outside.path().join("evil.txt").exists());
    }
}
