//! Repository providers for snapfs
//!
//! - `memory`: everything in maps, with load counters
//! - `local`: content-addressed objects in a local directory

#[cfg(feature = "local")]
mod local;
mod memory;

#[cfg(feature = "local")]
pub use local::{LocalConfig, LocalRepository};
pub use memory::MemoryRepository;
