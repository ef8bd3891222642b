//! # filelane-kernel
//!
//! Serializes operations on remotely backed files, one lane per file.
//!
//! Every path folds into a [`FileKey`]. Operations on the same key run one
//! at a time in submission order; operations on different keys run
//! concurrently. Callers submit through [`FilesManager`] and receive a
//! [`Completion`] that resolves after the operation has executed.
//!
//! ```text
//!   FilesManager ──▶ Director ──▶ lane(/notes/a.txt) ──▶ RemoteStore
//!        │              │     └─▶ lane(/notes/b.txt) ──▶ RemoteStore
//!        │              └── Registry: key → lane + open handle
//!        └── file_for_path(): direct registry read
//! ```
//!
//! The remote is abstracted by [`RemoteStore`]; [`MemoryStore`] and
//! [`LocalStore`] are provided.

pub mod config;
pub mod constants;
mod director;
mod dispatch;
mod envelope;
pub mod error;
mod handle;
mod lane;
mod manager;
mod registry;
pub mod store;

pub use config::{ConfigError, FilesConfig};
pub use dispatch::Completion;
pub use error::{FilesError, FilesResult};
pub use handle::FileHandle;
pub use manager::{FilesManager, ManagerStats};
pub use store::{LocalStore, MemoryStore, RemoteStore, StoreError, StoreResult};

pub use filelane_types::{
    CaseFolding, FileInfo, FileKey, FilePath, IntoFilePath, OpKind, PathError, Revision,
};
