//! Remote file metadata and operation kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::path::FilePath;

/// Content revision reported by the remote store.
///
/// Revisions never move backward for a given file. Stores with a per-write
/// counter return a strictly greater revision on every successful write.
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Revision of a file that has never been written.
    pub const INITIAL: Revision = Revision(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The next revision after this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

/// Metadata for a remote file, as returned by create/open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path as the remote store spells it.
    pub path: FilePath,
    /// Current content revision.
    pub revision: Revision,
    /// Content size in bytes.
    pub size: u64,
}

impl FileInfo {
    pub fn new(path: FilePath, revision: Revision, size: u64) -> Self {
        Self {
            path,
            revision,
            size,
        }
    }
}

/// Kind of operation carried by an envelope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Create,
    CreateFolder,
    Open,
    Read,
    Write,
    Close,
}
