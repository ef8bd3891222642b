//! Remote store operations trait.
//!
//! The kernel never talks to the network itself. Everything that touches
//! remote state goes through this trait, one call at a time per file.

use async_trait::async_trait;
use filelane_types::{CaseFolding, FileInfo, FilePath, Revision};

use super::StoreResult;

/// Primitive calls offered by a remote storage client.
///
/// Implementations may take arbitrarily long (network-bound) and are
/// responsible for their own timeouts. A call that hangs stalls only the
/// lane that issued it.
///
/// Calls are whole-file: reads return the entire content and writes replace
/// it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// How this store matches path spellings. Two paths that fold to the
    /// same key under this policy must name the same remote file.
    fn case_folding(&self) -> CaseFolding;

    /// Create a new, empty file. Fails if the path already exists.
    async fn create_file(&self, path: &FilePath) -> StoreResult<FileInfo>;

    /// Open an existing file, returning its current metadata.
    async fn open_file(&self, path: &FilePath) -> StoreResult<FileInfo>;

    /// Read the whole content of a file.
    async fn read_bytes(&self, path: &FilePath) -> StoreResult<Vec<u8>>;

    /// Replace the whole content of a file, returning the new revision.
    async fn write_bytes(&self, path: &FilePath, data: &[u8]) -> StoreResult<Revision>;

    /// Create a folder (and any missing parents), returning its path as the
    /// remote spells it.
    async fn create_folder(&self, path: &FilePath) -> StoreResult<FilePath>;
}
