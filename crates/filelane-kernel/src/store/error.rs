//! Remote store error types.

use std::io;
use thiserror::Error;

/// Error reported by a remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Path does not exist on the remote.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists on the remote.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a file, found a folder.
    #[error("is a folder: {0}")]
    IsAFolder(String),

    /// A path component is a file where a folder is required.
    #[error("not a folder: {0}")]
    NotAFolder(String),

    /// Path resolves outside the store's root.
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// The remote holds a divergent edit (e.g. from another device).
    #[error("conflicting remote edit: {0}")]
    Conflict(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create an IsAFolder error.
    pub fn is_a_folder(path: impl Into<String>) -> Self {
        Self::IsAFolder(path.into())
    }

    /// Create a NotAFolder error.
    pub fn not_a_folder(path: impl Into<String>) -> Self {
        Self::NotAFolder(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create a Conflict error.
    pub fn conflict(path: impl Into<String>) -> Self {
        Self::Conflict(path.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the remote reported the path as absent.
    ///
    /// I/O errors of kind `NotFound` count, so disk-backed stores don't have
    /// to translate them first.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Store result type.
pub type StoreResult<T> = Result<T, StoreError>;
