//! Remote store backends.

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;
