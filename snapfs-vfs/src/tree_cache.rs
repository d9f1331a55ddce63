//! Per-snapshot tree cache

use parking_lot::Mutex;
use snapfs_core::Tree;
use std::collections::HashMap;
use std::sync::Arc;

/// Decoded trees of one snapshot, keyed by their path below the snapshot
/// root (see [`snapfs_core::path::tree_key`]). Entries are never evicted.
#[derive(Debug, Default)]
pub struct TreeCache {
    trees: Mutex<HashMap<String, Arc<Tree>>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Arc<Tree>> {
        self.trees.lock().get(path).cloned()
    }

    /// Store `tree` under `path`, replacing any earlier entry
    pub fn insert(&self, path: impl Into<String>, tree: Tree) -> Arc<Tree> {
        let tree = Arc::new(tree);
        self.trees.lock().insert(path.into(), tree.clone());
        tree
    }

    pub fn len(&self) -> usize {
        self.trees.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapfs_core::Node;

    #[test]
    fn test_insert_and_get() {
        let cache = TreeCache::new();
        assert!(cache.get("").is_none());

        cache.insert("", Tree::new(vec![Node::file("a", 1, vec![])]));
        cache.insert("/docs", Tree::default());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("").unwrap().nodes[0].name, "a");
        assert!(cache.get("/docs").unwrap().nodes.is_empty());
        assert!(cache.get("/other").is_none());
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = TreeCache::new();
        cache.insert("/x", Tree::default());
        cache.insert("/x", Tree::new(vec![Node::other("l", "symlink")]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/x").unwrap().nodes.len(), 1);
    }
}
