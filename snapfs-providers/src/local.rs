//! Local directory repository
//!
//! Layout, rooted at one directory:
//!
//! ```text
//! snapshots/<id>.json      one JSON snapshot record per file
//! trees/<hh>/<rest>        JSON-encoded trees, sharded by id prefix
//! data/<hh>/<rest>         raw chunk contents, sharded by id prefix
//! ```
//!
//! Every object is named by the BLAKE3 hash of its content and verified on
//! read.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use snapfs_core::{
    BlobKind, ChunkId, Context, Id, Repository, ResultExt, SnapError, SnapResult, Snapshot,
    SnapshotFilter, Tree, TreeId,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::MemoryRepository;

const SNAPSHOTS_DIR: &str = "snapshots";
const TREES_DIR: &str = "trees";
const DATA_DIR: &str = "data";

/// Sharded location of an object below `base`
fn storage_path(base: &Path, id: &Id) -> PathBuf {
    let hex = id.to_hex();
    base.join(&hex[0..2]).join(&hex[2..])
}

fn kind_dir(kind: BlobKind) -> &'static str {
    match kind {
        BlobKind::Data => DATA_DIR,
        BlobKind::Tree => TREES_DIR,
    }
}

/// Local repository configuration
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub root: PathBuf,
    /// Re-hash objects on read
    pub verify_on_read: bool,
}

impl LocalConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            verify_on_read: true,
        }
    }
}

/// Read-only repository stored in a local directory
pub struct LocalRepository {
    config: LocalConfig,
    index: RwLock<HashMap<(BlobKind, Id), u64>>,
}

impl LocalRepository {
    pub fn new(config: LocalConfig) -> Self {
        Self {
            config,
            index: RwLock::new(HashMap::new()),
        }
    }

    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(LocalConfig::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn object_path(&self, kind: BlobKind, id: &Id) -> PathBuf {
        storage_path(&self.config.root.join(kind_dir(kind)), id)
    }

    async fn read_object(&self, kind: BlobKind, id: &Id) -> SnapResult<Bytes> {
        let path = self.object_path(kind, id);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapError::ObjectNotFound(format!("{} {id}", kind_dir(kind))));
            }
            Err(e) => return Err(SnapError::Io(e)).with_context(|| path.display().to_string()),
        };

        if self.config.verify_on_read && Id::hash(&data) != *id {
            return Err(SnapError::Corrupted(path.display().to_string()));
        }

        Ok(Bytes::from(data))
    }

    /// Walk one sharded object directory, recording each object's length
    async fn scan_objects(&self, kind: BlobKind) -> SnapResult<Vec<(Id, u64)>> {
        let base = self.config.root.join(kind_dir(kind));
        let mut found = Vec::new();

        let mut shards = match fs::read_dir(&base).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(SnapError::Io(e)).with_context(|| base.display().to_string()),
        };

        while let Some(shard) = shards.next_entry().await? {
            let prefix = shard.file_name().to_string_lossy().to_string();
            if prefix.len() != 2 || !shard.file_type().await?.is_dir() {
                continue;
            }

            let mut files = fs::read_dir(shard.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let name = file.file_name().to_string_lossy().to_string();
                match Id::from_hex(&format!("{prefix}{name}")) {
                    Ok(id) => found.push((id, file.metadata().await?.len())),
                    Err(_) => debug!(path = %file.path().display(), "skipping stray file"),
                }
            }
        }

        Ok(found)
    }

    async fn read_snapshots(&self) -> SnapResult<Vec<Snapshot>> {
        let dir = self.config.root.join(SNAPSHOTS_DIR);
        let mut snapshots = Vec::new();

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(SnapError::Io)
            .with_context(|| dir.display().to_string())?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read(&path).await?;
            let snapshot: Snapshot = serde_json::from_slice(&data)
                .map_err(SnapError::from)
                .with_context(|| path.display().to_string())?;
            snapshots.push(snapshot);
        }

        snapshots.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));
        Ok(snapshots)
    }

    /// Write the contents of an in-memory repository in this layout
    pub async fn export(root: impl AsRef<Path>, source: &MemoryRepository) -> SnapResult<()> {
        let root = root.as_ref();

        let snapshots_dir = root.join(SNAPSHOTS_DIR);
        fs::create_dir_all(&snapshots_dir).await?;
        for snapshot in source.snapshots() {
            let path = snapshots_dir.join(format!("{}.json", snapshot.id));
            fs::write(&path, serde_json::to_vec_pretty(&snapshot)?).await?;
        }

        for (id, tree) in source.trees() {
            write_object(&root.join(TREES_DIR), &id, &tree.encode()?).await?;
        }

        for (id, data) in source.chunks() {
            write_object(&root.join(DATA_DIR), &id, &data).await?;
        }

        Ok(())
    }
}

async fn write_object(base: &Path, id: &Id, data: &[u8]) -> SnapResult<()> {
    let path = storage_path(base, id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&path, data).await?;
    Ok(())
}

#[async_trait]
impl Repository for LocalRepository {
    async fn load_index(&self, ctx: &Context) -> SnapResult<()> {
        ctx.run(async {
            let mut index = HashMap::new();
            for kind in [BlobKind::Data, BlobKind::Tree] {
                for (id, size) in self.scan_objects(kind).await? {
                    index.insert((kind, id), size);
                }
            }
            debug!(root = %self.config.root.display(), objects = index.len(), "index loaded");
            *self.index.write() = index;
            Ok(())
        })
        .await
    }

    async fn list_snapshots(
        &self,
        ctx: &Context,
        filter: &SnapshotFilter,
    ) -> SnapResult<Vec<Snapshot>> {
        let snapshots = ctx.run(self.read_snapshots()).await?;
        Ok(snapshots.into_iter().filter(|s| filter.matches(s)).collect())
    }

    async fn load_tree(&self, ctx: &Context, id: &TreeId) -> SnapResult<Tree> {
        let data = ctx.run(self.read_object(BlobKind::Tree, id)).await?;
        serde_json::from_slice(&data)
            .map_err(SnapError::from)
            .with_context(|| format!("decode tree {id}"))
    }

    async fn load_chunk(&self, ctx: &Context, kind: BlobKind, id: &ChunkId) -> SnapResult<Bytes> {
        let data = ctx.run(self.read_object(kind, id)).await?;
        if let Some(&indexed) = self.index.read().get(&(kind, *id)) {
            if indexed != data.len() as u64 {
                warn!(
                    chunk = %id.short(),
                    indexed,
                    actual = data.len(),
                    "chunk size differs from index"
                );
            }
        }
        Ok(data)
    }

    async fn lookup_chunk_size(
        &self,
        ctx: &Context,
        id: &ChunkId,
        kind: BlobKind,
    ) -> SnapResult<Option<u64>> {
        ctx.check()?;
        Ok(self.index.read().get(&(kind, *id)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapfs_core::Node;

    async fn fixture() -> (tempfile::TempDir, MemoryRepository, Snapshot) {
        let dir = tempfile::tempdir().unwrap();
        let mem = MemoryRepository::new();

        let file = mem.add_file("a.txt", &[b"he", b"llo"]);
        let docs = mem.add_tree(Tree::new(vec![file])).unwrap();
        let root = mem.add_tree(Tree::new(vec![Node::directory("docs", docs)])).unwrap();
        let snapshot = mem.snapshot_at("2024-01-01T00:00:00Z", root).unwrap();

        LocalRepository::export(dir.path(), &mem).await.unwrap();
        (dir, mem, snapshot)
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let (dir, mem, snapshot) = fixture().await;
        let repo = LocalRepository::open(dir.path());
        let ctx = Context::background();
        repo.load_index(&ctx).await.unwrap();

        let snapshots = repo.list_snapshots(&ctx, &SnapshotFilter::default()).await.unwrap();
        assert_eq!(snapshots, vec![snapshot.clone()]);

        let root = repo.load_tree(&ctx, &snapshot.tree).await.unwrap();
        assert_eq!(root.nodes[0].name, "docs");

        for (id, data) in mem.chunks() {
            let size = repo.lookup_chunk_size(&ctx, &id, BlobKind::Data).await.unwrap();
            assert_eq!(size, Some(data.len() as u64));
            assert_eq!(repo.load_chunk(&ctx, BlobKind::Data, &id).await.unwrap(), data);
        }
    }

    #[tokio::test]
    async fn test_unindexed_before_load_index() {
        let (dir, mem, _) = fixture().await;
        let repo = LocalRepository::open(dir.path());
        let ctx = Context::background();
        let (id, _) = mem.chunks().into_iter().next().unwrap();
        assert_eq!(repo.lookup_chunk_size(&ctx, &id, BlobKind::Data).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corruption_detected() {
        let (dir, mem, _) = fixture().await;
        let (id, _) = mem.chunks().into_iter().next().unwrap();
        let path = storage_path(&dir.path().join(DATA_DIR), &id);
        std::fs::write(&path, b"tampered").unwrap();

        let repo = LocalRepository::open(dir.path());
        let ctx = Context::background();
        assert!(matches!(
            repo.load_chunk(&ctx, BlobKind::Data, &id).await,
            Err(SnapError::Corrupted(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_object() {
        let (dir, _, _) = fixture().await;
        let repo = LocalRepository::open(dir.path());
        let ctx = Context::background();
        assert!(matches!(
            repo.load_tree(&ctx, &Id::hash(b"absent")).await,
            Err(SnapError::ObjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshots_sorted_by_time() {
        let dir = tempfile::tempdir().unwrap();
        let mem = MemoryRepository::new();
        let tree = mem.add_tree(Tree::default()).unwrap();
        mem.snapshot_at("2024-05-01T00:00:00Z", tree).unwrap();
        mem.snapshot_at("2023-05-01T00:00:00Z", tree).unwrap();
        LocalRepository::export(dir.path(), &mem).await.unwrap();

        let repo = LocalRepository::open(dir.path());
        let names: Vec<String> = repo
            .list_snapshots(&Context::background(), &SnapshotFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|s| s.display_name())
            .collect();
        assert_eq!(names, ["2023-05-01T00:00:00Z", "2024-05-01T00:00:00Z"]);
    }

    #[test]
    fn test_storage_path_sharding() {
        let id = Id::from_bytes([0xab; 32]);
        let path = storage_path(Path::new("/repo/data"), &id);
        assert!(path.starts_with("/repo/data/ab"));
        assert_eq!(path.file_name().unwrap().len(), 62);
    }
}
