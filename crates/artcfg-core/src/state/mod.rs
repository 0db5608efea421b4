//! State store implementations
//!
//! - [`MemoryStateStore`]: in-memory, non-persistent (tests, ad-hoc runs)
//! - [`FileStateStore`]: JSON file with atomic writes and backup recovery

pub mod file;
pub mod memory;

pub use file::{FileStateStore, FileStateStoreFactory};
pub use memory::{MemoryStateStore, MemoryStateStoreFactory};
