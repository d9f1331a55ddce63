//! Repository trait
//!
//! The read-only view of a backup repository that snapfs needs. Encryption,
//! pack files, deduplication and transport all live behind it.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    context::Context,
    error::SnapResult,
    id::{ChunkId, TreeId},
    model::{BlobKind, Snapshot, SnapshotFilter, Tree},
};

/// Backing store of snapshots, trees and chunks
#[async_trait]
pub trait Repository: Send + Sync {
    /// Prepare the chunk size index. Called once before anything else.
    async fn load_index(&self, _ctx: &Context) -> SnapResult<()> {
        Ok(())
    }

    /// Snapshots matching `filter`, in the repository's own order
    async fn list_snapshots(
        &self,
        ctx: &Context,
        filter: &SnapshotFilter,
    ) -> SnapResult<Vec<Snapshot>>;

    async fn load_tree(&self, ctx: &Context, id: &TreeId) -> SnapResult<Tree>;

    /// Decoded content of one blob
    async fn load_chunk(&self, ctx: &Context, kind: BlobKind, id: &ChunkId) -> SnapResult<Bytes>;

    /// Length of a blob according to the index, without fetching it
    async fn lookup_chunk_size(
        &self,
        ctx: &Context,
        id: &ChunkId,
        kind: BlobKind,
    ) -> SnapResult<Option<u64>>;
}
