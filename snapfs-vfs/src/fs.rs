//! The filesystem root

use snapfs_cache::ChunkCache;
use snapfs_core::{Context, EntryInfo, FsPath, Repository, SnapError, SnapResult};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::SnapshotCatalog;
use crate::config::VfsConfig;
use crate::handle::Handle;

/// Read-only view of a repository's snapshots
///
/// The root lists one directory per snapshot; below that, each snapshot's
/// trees. Share it between tasks behind an `Arc`.
pub struct VirtualFilesystem {
    cache: Arc<ChunkCache>,
    catalog: SnapshotCatalog,
    config: VfsConfig,
}

impl VirtualFilesystem {
    /// Load the repository index and snapshot list
    pub async fn new(
        repo: Arc<dyn Repository>,
        config: VfsConfig,
        ctx: &Context,
    ) -> SnapResult<Self> {
        repo.load_index(ctx).await?;

        let cache = Arc::new(ChunkCache::new(config.cache.clone()));
        let catalog = SnapshotCatalog::load(ctx, repo, cache.clone(), &config.filter).await?;
        debug!(snapshots = catalog.len(), cache = cache.capacity(), "filesystem ready");

        Ok(Self {
            cache,
            catalog,
            config,
        })
    }

    /// Open a file or directory.
    ///
    /// `path` is relative and slash separated; `"."` is the root.
    pub async fn open(&self, ctx: &Context, path: &str) -> SnapResult<Handle> {
        let path = FsPath::parse(path)?;
        let Some(name) = path.snapshot() else {
            return Ok(Handle::Directory(self.catalog.listing()));
        };

        let dir = self
            .catalog
            .lookup(name)
            .ok_or_else(|| SnapError::SnapshotNotFound(name.to_string()))?;

        debug!(%path, "open");
        dir.lookup(ctx, path.rest()).await
    }

    pub async fn stat(&self, ctx: &Context, path: &str) -> SnapResult<EntryInfo> {
        Ok(self.open(ctx, path).await?.stat())
    }

    pub fn catalog(&self) -> &SnapshotCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }
}

impl std::fmt::Debug for VirtualFilesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFilesystem")
            .field("catalog", &self.catalog)
            .field("cache_capacity", &self.cache.capacity())
            .finish()
    }
}
