//! Path resolution inside one snapshot

use snapfs_cache::ChunkCache;
use snapfs_core::path::tree_key;
use snapfs_core::{
    Context, DirectoryListing, EntryInfo, NodeKind, Repository, ResultExt, SnapError, SnapResult,
    Snapshot, Tree, TreeId,
};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::handle::Handle;
use crate::reader::FileReader;
use crate::tree_cache::TreeCache;

/// One snapshot as a directory
///
/// Walks the snapshot's trees from its root, loading each tree at most once
/// per path and keeping it for the life of the filesystem.
pub struct SnapshotDir {
    snapshot: Snapshot,
    name: String,
    trees: TreeCache,
    repo: Arc<dyn Repository>,
    cache: Arc<ChunkCache>,
}

impl SnapshotDir {
    pub fn new(snapshot: Snapshot, repo: Arc<dyn Repository>, cache: Arc<ChunkCache>) -> Self {
        Self {
            name: snapshot.display_name(),
            snapshot,
            trees: TreeCache::new(),
            repo,
            cache,
        }
    }

    /// Directory name: the snapshot time in RFC 3339
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn stat(&self) -> EntryInfo {
        EntryInfo::directory(&self.name)
    }

    /// Trees loaded so far
    pub fn cached_trees(&self) -> usize {
        self.trees.len()
    }

    /// Tree stored at `path`, fetched from the repository on first use.
    ///
    /// Two tasks missing on the same path both fetch; whichever stores last
    /// wins. Either result is the same tree.
    pub async fn load_tree(&self, ctx: &Context, path: &str, id: &TreeId) -> SnapResult<Arc<Tree>> {
        if let Some(tree) = self.trees.get(path) {
            trace!(snapshot = %self.name, path, "tree cache hit");
            return Ok(tree);
        }

        let tree = self
            .repo
            .load_tree(ctx, id)
            .await
            .with_context(|| format!("load tree {} at {}{path}", id.short(), self.name))?;
        debug!(snapshot = %self.name, path, nodes = tree.nodes.len(), "loaded tree");

        Ok(self.trees.insert(path, tree))
    }

    /// Resolve `segments` below the snapshot root
    pub async fn lookup(&self, ctx: &Context, segments: &[String]) -> SnapResult<Handle> {
        let mut key = String::new();
        let mut tree_id = self.snapshot.tree;
        let mut dir_name = self.name.clone();

        for (depth, segment) in segments.iter().enumerate() {
            let tree = self.load_tree(ctx, &key, &tree_id).await?;
            let display = || format!("{}/{}", self.name, segments[..=depth].join("/"));

            let node = tree
                .find(segment)
                .ok_or_else(|| SnapError::NodeNotFound(display()))?;

            match &node.kind {
                NodeKind::Directory { subtree } => {
                    key = tree_key(&key, segment);
                    tree_id = *subtree;
                    dir_name = segment.clone();
                }
                NodeKind::File { .. } => {
                    if depth + 1 < segments.len() {
                        return Err(SnapError::NodeNotFound(format!(
                            "{}/{}",
                            self.name,
                            segments.join("/")
                        )));
                    }
                    let reader =
                        FileReader::open(ctx, self.repo.clone(), self.cache.clone(), node).await?;
                    return Ok(Handle::File(reader));
                }
                NodeKind::Other { type_name } => {
                    return Err(SnapError::UnsupportedNodeType {
                        path: display(),
                        type_name: type_name.clone(),
                    });
                }
            }
        }

        let tree = self.load_tree(ctx, &key, &tree_id).await?;
        let entries = tree.nodes.iter().map(EntryInfo::from_node).collect();
        Ok(Handle::Directory(DirectoryListing::new(
            EntryInfo::directory(dir_name),
            entries,
        )))
    }
}

impl std::fmt::Debug for SnapshotDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotDir")
            .field("name", &self.name)
            .field("id", &self.snapshot.id)
            .finish()
    }
}
