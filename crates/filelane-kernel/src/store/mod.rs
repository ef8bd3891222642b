//! Remote storage collaborator.
//!
//! The kernel consumes remote storage through [`RemoteStore`]; it never
//! interprets paths beyond their string form and never performs network I/O
//! itself. Two stores ship with the crate:
//!
//! - [`MemoryStore`] - In-memory, case-insensitive (testing, offline use)
//! - [`LocalStore`] - A directory on disk (with path security)

pub mod backends;
mod error;
mod ops;

pub use backends::{LocalStore, MemoryStore};
pub use error::{StoreError, StoreResult};
pub use ops::RemoteStore;
