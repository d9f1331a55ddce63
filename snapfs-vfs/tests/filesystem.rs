//! Filesystem behaviour end to end, against in-memory and on-disk repositories

use snapfs_cache::CacheConfig;
use snapfs_core::{ChunkId, Context, Id, Node, NodeKind, SnapError, Tree};
use snapfs_providers::{LocalRepository, MemoryRepository};
use snapfs_vfs::{FileReader, Handle, VfsConfig, VirtualFilesystem};
use std::io::SeekFrom;
use std::sync::Arc;

const SNAP: &str = "2024-01-01T00:00:00Z";

/// One snapshot holding `docs/a.txt` ("hello" in two chunks), a larger
/// multi-chunk file and a symlink.
fn sample_repository() -> Arc<MemoryRepository> {
    let repo = Arc::new(MemoryRepository::new());

    let a = repo.add_file("a.txt", &[b"he", b"llo"]);
    let big = repo.add_file("big.bin", &[b"0123", b"", b"45678", b"9", b"abcdefg"]);
    let docs = repo.add_tree(Tree::new(vec![a, big])).unwrap();
    let root = repo
        .add_tree(Tree::new(vec![
            Node::directory("docs", docs),
            Node::other("link", "symlink"),
        ]))
        .unwrap();
    repo.snapshot_at(SNAP, root).unwrap();
    repo
}

async fn mount(repo: Arc<MemoryRepository>, config: VfsConfig) -> VirtualFilesystem {
    VirtualFilesystem::new(repo, config, &Context::background())
        .await
        .unwrap()
}

/// Everything from `offset` to end of file, read in small steps
async fn read_all(file: &FileReader, mut offset: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 3];
    loop {
        let n = file.read_at(&mut buf, offset).await.unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
        offset += n as u64;
    }
}

fn content_of(node: &Node) -> Vec<ChunkId> {
    match &node.kind {
        NodeKind::File { content } => content.clone(),
        _ => panic!("not a file: {}", node.name),
    }
}

#[tokio::test]
async fn test_end_to_end_read() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let ctx = Context::background();

    let mut file = fs
        .open(&ctx, "2024-01-01T00:00:00Z/docs/a.txt")
        .await
        .unwrap()
        .into_file()
        .unwrap();

    let stat = file.stat();
    assert_eq!(stat.name, "a.txt");
    assert_eq!(stat.size, 5);
    assert!(!stat.is_dir);
    assert_eq!(stat.mode, 0o444);
    assert!(stat.modified.is_none());

    let mut buf = [0u8; 16];
    let n = file.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"hello");
    assert_eq!(file.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_root_lists_snapshots_in_repository_order() {
    let repo = sample_repository();
    let tree = repo.add_tree(Tree::default()).unwrap();
    repo.snapshot_at("2023-06-15T08:00:00-05:00", tree).unwrap();
    repo.snapshot_at("2025-01-01T00:00:00Z", tree).unwrap();

    let fs = mount(repo, VfsConfig::default()).await;
    let mut root = fs.open(&Context::background(), ".").await.unwrap();

    let stat = root.stat();
    assert!(stat.is_dir);
    assert_eq!(stat.name, "");
    assert_eq!(stat.mode, 0o755);

    let entries = root.read_dir(0).unwrap().unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, [SNAP, "2023-06-15T08:00:00-05:00", "2025-01-01T00:00:00Z"]);
    assert!(entries.iter().all(|e| e.is_dir));
}

#[tokio::test]
async fn test_directory_listing_pages() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let mut dir = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/docs")
        .await
        .unwrap()
        .into_directory()
        .unwrap();

    assert_eq!(dir.name(), "docs");
    let first = dir.read_dir(1).unwrap();
    assert_eq!(first[0].name, "a.txt");
    let second = dir.read_dir(1).unwrap();
    assert_eq!(second[0].name, "big.bin");
    assert_eq!(second[0].size, 17);
    assert!(dir.read_dir(1).is_none());
}

#[tokio::test]
async fn test_read_at_is_independent_of_chunk_boundaries() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let file = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/docs/big.bin")
        .await
        .unwrap()
        .into_file()
        .unwrap();

    let expected = b"0123456789abcdefg";
    assert_eq!(file.size(), expected.len() as u64);

    for offset in 0..=expected.len() {
        for len in 0..=expected.len() - offset {
            let mut buf = vec![0u8; len];
            let mut filled = 0;
            while filled < len {
                let n = file
                    .read_at(&mut buf[filled..], (offset + filled) as u64)
                    .await
                    .unwrap();
                assert!(n > 0, "unexpected EOF at {offset}+{filled}");
                filled += n;
            }
            assert_eq!(&buf[..], &expected[offset..offset + len], "offset {offset} len {len}");
        }
    }
}

#[tokio::test]
async fn test_seek_to_end_then_read_is_eof() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let mut handle = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/docs/big.bin")
        .await
        .unwrap();

    let Handle::File(file) = &mut handle else {
        panic!("expected a file");
    };
    assert_eq!(file.seek(SeekFrom::End(0)).unwrap(), 17);

    let mut buf = [0u8; 8];
    assert_eq!(handle.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_negative_seek_is_invalid() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let mut file = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/docs/a.txt")
        .await
        .unwrap()
        .into_file()
        .unwrap();

    assert!(matches!(
        file.seek(SeekFrom::Current(-1)),
        Err(SnapError::InvalidArgument(_))
    ));
    assert_eq!(file.position(), 0);
}

#[tokio::test]
async fn test_chunks_fetched_once_across_handles() {
    let repo = sample_repository();
    let fs = mount(repo.clone(), VfsConfig::default()).await;
    let ctx = Context::background();
    let path = "2024-01-01T00:00:00Z/docs/big.bin";

    let first = fs.open(&ctx, path).await.unwrap().into_file().unwrap();
    let second = fs.open(&ctx, path).await.unwrap().into_file().unwrap();

    let a = read_all(&first, 0).await;
    let b = read_all(&second, 0).await;
    assert_eq!(a, b);

    let docs = repo.trees().into_iter().find_map(|(_, t)| t.find("big.bin").cloned()).unwrap();
    for id in content_of(&docs) {
        assert_eq!(repo.chunk_loads_of(&id), 1);
    }
    assert_eq!(fs.cache().stats().miss_count, 5);
    assert!(fs.cache().stats().hit_count >= 5);
}

#[tokio::test]
async fn test_small_cache_evicts_least_recently_used() {
    let repo = Arc::new(MemoryRepository::new());
    let file = repo.add_file("f", &[b"aaaa", b"bbbb", b"cccc"]);
    let ids = content_of(&file);
    let root = repo.add_tree(Tree::new(vec![file])).unwrap();
    repo.snapshot_at(SNAP, root).unwrap();

    let config = VfsConfig {
        cache: CacheConfig::with_max_size(8),
        ..Default::default()
    };
    let fs = mount(repo.clone(), config).await;
    let file = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/f")
        .await
        .unwrap()
        .into_file()
        .unwrap();

    let mut buf = [0u8; 4];
    file.read_at(&mut buf, 0).await.unwrap(); // a
    file.read_at(&mut buf, 4).await.unwrap(); // b
    file.read_at(&mut buf, 0).await.unwrap(); // a again, b is now oldest
    file.read_at(&mut buf, 8).await.unwrap(); // c evicts b

    assert!(fs.cache().contains(&ids[0]));
    assert!(!fs.cache().contains(&ids[1]));
    assert!(fs.cache().contains(&ids[2]));
    assert!(fs.cache().size() <= 8);

    file.read_at(&mut buf, 4).await.unwrap();
    assert_eq!(repo.chunk_loads_of(&ids[0]), 1);
    assert_eq!(repo.chunk_loads_of(&ids[1]), 2);
}

#[tokio::test]
async fn test_declared_size_is_repaired() {
    let repo = Arc::new(MemoryRepository::new());
    let a = repo.add_chunk(vec![b'x'; 50]);
    let b = repo.add_chunk(vec![b'y'; 30]);
    let root = repo
        .add_tree(Tree::new(vec![Node::file("wrong", 100, vec![a, b])]))
        .unwrap();
    repo.snapshot_at(SNAP, root).unwrap();

    let fs = mount(repo, VfsConfig::default()).await;
    let ctx = Context::background();
    let path = "2024-01-01T00:00:00Z/wrong";

    assert_eq!(fs.stat(&ctx, path).await.unwrap().size, 80);

    let file = fs.open(&ctx, path).await.unwrap().into_file().unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(file.read_at(&mut buf, 80).await.unwrap(), 0);
    assert_eq!(file.read_at(&mut buf, 75).await.unwrap(), 5);
}

#[tokio::test]
async fn test_path_past_a_file_is_not_found() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let err = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/docs/a.txt/more")
        .await
        .unwrap_err();
    assert!(matches!(err, SnapError::NodeNotFound(_)));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_missing_names() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let ctx = Context::background();

    let err = fs.open(&ctx, "2020-01-01T00:00:00Z").await.unwrap_err();
    assert!(matches!(err, SnapError::SnapshotNotFound(_)));
    assert!(err.is_not_found());

    let err = fs.open(&ctx, "2024-01-01T00:00:00Z/nope").await.unwrap_err();
    assert!(matches!(err, SnapError::NodeNotFound(_)));
}

#[tokio::test]
async fn test_malformed_paths_are_not_found() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let ctx = Context::background();

    for path in [
        "",
        "/",
        "/2024-01-01T00:00:00Z",
        "2024-01-01T00:00:00Z/",
        "2024-01-01T00:00:00Z//docs",
        "./2024-01-01T00:00:00Z",
        "2024-01-01T00:00:00Z/docs/..",
        "2024-01-01T00:00:00Z/./docs",
        "a\0b",
    ] {
        let err = fs.open(&ctx, path).await.unwrap_err();
        assert!(matches!(err, SnapError::InvalidPath(_)), "{path:?}: {err}");
        assert!(err.is_not_found(), "{path:?}");
    }
}

#[tokio::test]
async fn test_unsupported_node_is_reported() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let err = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/link")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SnapError::UnsupportedNodeType { ref type_name, .. } if type_name == "symlink"
    ));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_unindexed_chunk_fails_open() {
    let repo = Arc::new(MemoryRepository::new());
    let known = repo.add_chunk(&b"abc"[..]);
    let root = repo
        .add_tree(Tree::new(vec![Node::file(
            "f",
            6,
            vec![known, Id::hash(b"unknown")],
        )]))
        .unwrap();
    repo.snapshot_at(SNAP, root).unwrap();

    let fs = mount(repo, VfsConfig::default()).await;
    let err = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/f")
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), SnapError::ChunkSizeUnindexed(_)));
}

#[tokio::test]
async fn test_trees_load_once_per_path() {
    let repo = sample_repository();
    let fs = mount(repo.clone(), VfsConfig::default()).await;
    let ctx = Context::background();

    for _ in 0..3 {
        fs.open(&ctx, "2024-01-01T00:00:00Z/docs/a.txt").await.unwrap();
        fs.open(&ctx, "2024-01-01T00:00:00Z/docs").await.unwrap();
        fs.open(&ctx, "2024-01-01T00:00:00Z").await.unwrap();
    }
    assert_eq!(repo.tree_loads(), 2);
}

#[tokio::test]
async fn test_index_loaded_on_mount() {
    let repo = sample_repository();
    let _fs = mount(repo.clone(), VfsConfig::default()).await;
    assert_eq!(repo.index_loads(), 1);
}

#[tokio::test]
async fn test_filter_from_config() {
    let repo = sample_repository();
    let tree = repo.add_tree(Tree::default()).unwrap();
    let tagged = repo
        .snapshot_at("2024-02-01T00:00:00Z", tree)
        .unwrap()
        .with_tags(vec!["daily".into()]);
    repo.add_snapshot(tagged);

    let config = VfsConfig::from_toml_str("[filter]\ntags = [\"daily\"]").unwrap();
    let fs = mount(repo, config).await;

    let names: Vec<_> = fs.catalog().list_entries().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["2024-02-01T00:00:00Z"]);
}

#[tokio::test]
async fn test_cancelled_context() {
    let fs = mount(sample_repository(), VfsConfig::default()).await;
    let ctx = Context::background();
    ctx.cancel();

    let err = fs.open(&ctx, "2024-01-01T00:00:00Z/docs").await.unwrap_err();
    assert!(matches!(err.root_cause(), SnapError::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_share_one_reader() {
    let repo = sample_repository();
    let fs = Arc::new(mount(repo.clone(), VfsConfig::default()).await);
    let file = Arc::new(
        fs.open(&Context::background(), "2024-01-01T00:00:00Z/docs/big.bin")
            .await
            .unwrap()
            .into_file()
            .unwrap(),
    );

    let expected = b"0123456789abcdefg";
    let tasks: Vec<_> = (0..16u64)
        .map(|i| {
            let file = file.clone();
            tokio::spawn(async move {
                let offset = i % 17;
                let data = read_all(&file, offset).await;
                (offset, data)
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        let (offset, data) = result.unwrap();
        assert_eq!(data, &expected[offset as usize..]);
    }
}

#[tokio::test]
async fn test_local_repository_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    LocalRepository::export(dir.path(), &sample_repository())
        .await
        .unwrap();

    let repo = Arc::new(LocalRepository::open(dir.path()));
    let fs = VirtualFilesystem::new(repo, VfsConfig::default(), &Context::background())
        .await
        .unwrap();

    let file = fs
        .open(&Context::background(), "2024-01-01T00:00:00Z/docs/big.bin")
        .await
        .unwrap()
        .into_file()
        .unwrap();
    assert_eq!(read_all(&file, 0).await, b"0123456789abcdefg");
}
