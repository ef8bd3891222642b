//! Shared path identity and file metadata types for filelane.
//!
//! A leaf crate with no internal dependencies. Everything that addresses a
//! remote file goes through these types:
//!
//! |------------------|---------------------------------------------------|
//! | Type             | Purpose                                           |
//! |------------------|---------------------------------------------------|
//! | [`FilePath`]     | Normalized, case-preserving logical path          |
//! | [`FileKey`]      | Folded identity; the only addressing key          |
//! | [`CaseFolding`]  | Policy for deriving a key from a path             |
//! | [`Revision`]     | Remote content revision                           |
//! | [`FileInfo`]     | Remote metadata returned by create/open           |
//! | [`OpKind`]       | Which operation an envelope carries               |
//! |------------------|---------------------------------------------------|

pub mod file;
pub mod path;

pub use file::{FileInfo, OpKind, Revision};
pub use path::{CaseFolding, FileKey, FilePath, IntoFilePath, PathError, SEPARATOR};
