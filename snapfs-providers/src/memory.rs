//! In-memory repository
//!
//! Holds snapshots, trees and chunks in maps and counts every load, which
//! makes it the repository of choice for tests and demos.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use parking_lot::{Mutex, RwLock};
use snapfs_core::{
    BlobKind, ChunkId, Context, Id, Node, Repository, SnapError, SnapResult, Snapshot,
    SnapshotFilter, Tree, TreeId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Repository kept entirely in memory
#[derive(Default)]
pub struct MemoryRepository {
    snapshots: RwLock<Vec<Snapshot>>,
    trees: RwLock<HashMap<TreeId, Tree>>,
    chunks: RwLock<HashMap<ChunkId, Bytes>>,
    sizes: RwLock<HashMap<ChunkId, u64>>,
    chunk_loads: Mutex<HashMap<ChunkId, usize>>,
    tree_loads: AtomicUsize,
    index_loads: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a chunk and index its size
    pub fn add_chunk(&self, data: impl Into<Bytes>) -> ChunkId {
        let data = data.into();
        let id = Id::hash(&data);
        self.sizes.write().insert(id, data.len() as u64);
        self.chunks.write().insert(id, data);
        id
    }

    /// Store each part as a chunk and return a file node over them, with
    /// the declared size set to the real total
    pub fn add_file(&self, name: &str, parts: &[&[u8]]) -> Node {
        let content: Vec<ChunkId> = parts
            .iter()
            .map(|part| self.add_chunk(Bytes::copy_from_slice(part)))
            .collect();
        let size = parts.iter().map(|p| p.len() as u64).sum();
        Node::file(name, size, content)
    }

    /// Index a size for `id` without storing any data for it
    pub fn index_chunk_size(&self, id: ChunkId, size: u64) {
        self.sizes.write().insert(id, size);
    }

    /// Drop a chunk's data but keep its index entry
    pub fn remove_chunk_data(&self, id: &ChunkId) {
        self.chunks.write().remove(id);
    }

    pub fn add_tree(&self, tree: Tree) -> SnapResult<TreeId> {
        let id = tree.id()?;
        self.trees.write().insert(id, tree);
        Ok(id)
    }

    pub fn add_snapshot(&self, snapshot: Snapshot) {
        self.snapshots.write().push(snapshot);
    }

    /// Record a snapshot of `tree` taken at `time` (RFC 3339)
    pub fn snapshot_at(&self, time: &str, tree: TreeId) -> SnapResult<Snapshot> {
        let parsed = DateTime::parse_from_rfc3339(time)
            .map_err(|e| SnapError::InvalidArgument(format!("snapshot time {time:?}: {e}")))?;
        let id = Id::hash(format!("{time}:{tree}").as_bytes());
        let snapshot = Snapshot::new(id, parsed, tree);
        self.add_snapshot(snapshot.clone());
        Ok(snapshot)
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.read().clone()
    }

    pub fn trees(&self) -> Vec<(TreeId, Tree)> {
        self.trees.read().iter().map(|(id, t)| (*id, t.clone())).collect()
    }

    pub fn chunks(&self) -> Vec<(ChunkId, Bytes)> {
        self.chunks.read().iter().map(|(id, c)| (*id, c.clone())).collect()
    }

    /// Number of `load_chunk` calls so far
    pub fn chunk_loads(&self) -> usize {
        self.chunk_loads.lock().values().sum()
    }

    /// Number of `load_chunk` calls for one chunk
    pub fn chunk_loads_of(&self, id: &ChunkId) -> usize {
        self.chunk_loads.lock().get(id).copied().unwrap_or(0)
    }

    /// Number of `load_tree` calls so far
    pub fn tree_loads(&self) -> usize {
        self.tree_loads.load(Ordering::SeqCst)
    }

    pub fn index_loads(&self) -> usize {
        self.index_loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn load_index(&self, ctx: &Context) -> SnapResult<()> {
        ctx.check()?;
        self.index_loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_snapshots(
        &self,
        ctx: &Context,
        filter: &SnapshotFilter,
    ) -> SnapResult<Vec<Snapshot>> {
        ctx.check()?;
        Ok(self
            .snapshots
            .read()
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn load_tree(&self, ctx: &Context, id: &TreeId) -> SnapResult<Tree> {
        ctx.check()?;
        self.tree_loads.fetch_add(1, Ordering::SeqCst);
        self.trees
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SnapError::ObjectNotFound(format!("tree {id}")))
    }

    async fn load_chunk(&self, ctx: &Context, _kind: BlobKind, id: &ChunkId) -> SnapResult<Bytes> {
        ctx.check()?;
        *self.chunk_loads.lock().entry(*id).or_insert(0) += 1;
        self.chunks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SnapError::ObjectNotFound(format!("chunk {id}")))
    }

    async fn lookup_chunk_size(
        &self,
        ctx: &Context,
        id: &ChunkId,
        _kind: BlobKind,
    ) -> SnapResult<Option<u64>> {
        ctx.check()?;
        Ok(self.sizes.read().get(id).copied())
    }
}
