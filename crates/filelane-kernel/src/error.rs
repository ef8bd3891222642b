//! Caller-visible error types.
//!
//! Every failure is delivered through the operation's completion; none of
//! them are fatal to the manager or to the lane that produced them.

use std::string::FromUtf8Error;

use filelane_types::{FilePath, PathError};
use thiserror::Error;

use crate::store::StoreError;

/// Errors delivered to callers of [`FilesManager`](crate::FilesManager).
#[derive(Debug, Error)]
pub enum FilesError {
    /// `create` while a live handle is registered for the key.
    #[error("file already open: {0}")]
    AlreadyExists(FilePath),

    /// `read`/`write` without a live handle for the key.
    #[error("file not open: {0}")]
    NotOpen(FilePath),

    /// The remote reports the path as absent.
    #[error("not found: {0}")]
    NotFound(FilePath),

    /// Any other failure from the remote store, detail preserved.
    #[error("remote error on {path}: {source}")]
    Remote {
        path: FilePath,
        #[source]
        source: StoreError,
    },

    /// The caller passed a path that does not normalize.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// `read_string` on content that is not UTF-8.
    #[error("{path} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        path: FilePath,
        #[source]
        source: FromUtf8Error,
    },

    /// Submitted after shutdown began.
    #[error("files manager is shutting down")]
    ShuttingDown,

    /// The lane went away without replying.
    #[error("operation dropped before completion")]
    Dropped,
}

impl FilesError {
    /// Map a store error for `path` into the caller's vocabulary.
    pub fn from_store(path: &FilePath, source: StoreError) -> Self {
        if source.is_not_found() {
            FilesError::NotFound(path.clone())
        } else {
            FilesError::Remote {
                path: path.clone(),
                source,
            }
        }
    }
}

/// Result type for manager operations.
pub type FilesResult<T> = Result<T, FilesError>;
