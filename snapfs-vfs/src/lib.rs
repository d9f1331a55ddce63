// SPDX-License-Identifier: AGPL-3.0-or-later
//! Read-only virtual filesystem over backup snapshots
//!
//! ```text
//! .                                  one directory per snapshot
//! 2024-01-01T00:00:00Z/              the snapshot's root tree
//! 2024-01-01T00:00:00Z/docs/a.txt    file contents, stitched from chunks
//! ```
//!
//! [`VirtualFilesystem::open`] resolves a path to a [`Handle`]: either a
//! [`DirectoryListing`](snapfs_core::DirectoryListing) or a [`FileReader`].
//! Trees are cached per snapshot and chunk contents in one shared
//! [`ChunkCache`](snapfs_cache::ChunkCache).

mod catalog;
pub mod config;
mod fs;
mod handle;
mod navigator;
mod reader;
mod tree_cache;

pub use catalog::SnapshotCatalog;
pub use config::VfsConfig;
pub use fs::VirtualFilesystem;
pub use handle::Handle;
pub use navigator::SnapshotDir;
pub use reader::{CumulativeIndex, FileReader};
pub use tree_cache::TreeCache;
