//! Snapshot catalog: the top level of the filesystem
//!
//! Every snapshot becomes a directory named after its timestamp. The set is
//! read once, when the filesystem is created; snapshots added to the
//! repository later are not picked up.

use snapfs_cache::ChunkCache;
use snapfs_core::{
    Context, DirectoryListing, EntryInfo, Repository, SnapResult, Snapshot, SnapshotFilter,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::navigator::SnapshotDir;

pub struct SnapshotCatalog {
    dirs: Vec<SnapshotDir>,
    names: HashMap<String, usize>,
}

impl SnapshotCatalog {
    /// Fetch the snapshots matching `filter` and index them by name
    pub async fn load(
        ctx: &Context,
        repo: Arc<dyn Repository>,
        cache: Arc<ChunkCache>,
        filter: &SnapshotFilter,
    ) -> SnapResult<Self> {
        let snapshots = repo.list_snapshots(ctx, filter).await?;
        debug!(count = snapshots.len(), filtered = !filter.is_empty(), "listed snapshots");
        Ok(Self::from_snapshots(snapshots, repo, cache))
    }

    /// Build from an already fetched list, keeping its order.
    ///
    /// When two snapshots share a name the later one wins the lookup; both
    /// still appear in the listing.
    pub fn from_snapshots(
        snapshots: Vec<Snapshot>,
        repo: Arc<dyn Repository>,
        cache: Arc<ChunkCache>,
    ) -> Self {
        let mut dirs: Vec<SnapshotDir> = Vec::with_capacity(snapshots.len());
        let mut names = HashMap::with_capacity(snapshots.len());

        for snapshot in snapshots {
            let dir = SnapshotDir::new(snapshot, repo.clone(), cache.clone());
            if let Some(prev) = names.insert(dir.name().to_string(), dirs.len()) {
                let shadowed = &dirs[prev];
                warn!(
                    name = dir.name(),
                    kept = %dir.snapshot().id.short(),
                    shadowed = %shadowed.snapshot().id.short(),
                    "duplicate snapshot name"
                );
            }
            dirs.push(dir);
        }

        Self { dirs, names }
    }

    pub fn lookup(&self, name: &str) -> Option<&SnapshotDir> {
        self.names.get(name).map(|&i| &self.dirs[i])
    }

    /// One directory entry per snapshot, in catalog order
    pub fn list_entries(&self) -> Vec<EntryInfo> {
        self.dirs.iter().map(SnapshotDir::stat).collect()
    }

    /// The root directory
    pub fn listing(&self) -> DirectoryListing {
        DirectoryListing::new(EntryInfo::directory(""), self.list_entries())
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.dirs.iter().map(SnapshotDir::snapshot)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

impl std::fmt::Debug for SnapshotCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.dirs.iter().map(SnapshotDir::name)).finish()
    }
}
