//! snapfs core
//!
//! Identifiers, the snapshot data model, errors, directory entries, path
//! rules and the repository trait shared by every snapfs crate.

pub mod context;
pub mod entry;
pub mod error;
pub mod id;
pub mod model;
pub mod path;
pub mod repository;

pub use context::Context;
pub use entry::{DirectoryListing, EntryInfo};
pub use error::{ResultExt, SnapError, SnapResult};
pub use id::{ChunkId, Id, SnapshotId, TreeId};
pub use model::{BlobKind, Node, NodeKind, Snapshot, SnapshotFilter, Tree};
pub use path::FsPath;
pub use repository::Repository;
