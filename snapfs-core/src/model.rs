//! Snapshot data model
//!
//! Snapshots point at a root tree; a tree is one directory level holding an
//! ordered list of nodes; file nodes reference their content as an ordered
//! list of chunks.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::SnapResult;
use crate::id::{ChunkId, SnapshotId, TreeId};

/// Kind of blob requested from the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobKind {
    Data,
    Tree,
}

/// A point-in-time capture of a directory tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    /// Creation time, kept in its original UTC offset
    pub time: DateTime<FixedOffset>,
    /// Root tree
    pub tree: TreeId,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Snapshot {
    pub fn new(id: SnapshotId, time: DateTime<FixedOffset>, tree: TreeId) -> Self {
        Self {
            id,
            time,
            tree,
            hostname: None,
            paths: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Directory name of this snapshot: its creation time in RFC 3339,
    /// second precision, `Z` for UTC.
    pub fn display_name(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// What a node is, and where its content lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Directory { subtree: TreeId },
    File { content: Vec<ChunkId> },
    /// Symlinks, devices, sockets... not served
    Other { type_name: String },
}

/// One entry in a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Declared size; advisory for files, see the file reader
    #[serde(default)]
    pub size: u64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn directory(name: impl Into<String>, subtree: TreeId) -> Self {
        Self {
            name: name.into(),
            size: 0,
            kind: NodeKind::Directory { subtree },
        }
    }

    pub fn file(name: impl Into<String>, size: u64, content: Vec<ChunkId>) -> Self {
        Self {
            name: name.into(),
            size,
            kind: NodeKind::File { content },
        }
    }

    pub fn other(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            kind: NodeKind::Other {
                type_name: type_name.into(),
            },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            NodeKind::Directory { .. } => "dir",
            NodeKind::File { .. } => "file",
            NodeKind::Other { type_name } => type_name,
        }
    }
}

/// One directory level, nodes in display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Exact, case-sensitive lookup by name
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Canonical encoding used for content addressing
    pub fn encode(&self) -> SnapResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Content identifier of this tree
    pub fn id(&self) -> SnapResult<TreeId> {
        Ok(TreeId::hash(&self.encode()?))
    }
}

/// Restricts which snapshots a repository returns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotFilter {
    /// Snapshot must come from one of these hosts
    pub hosts: Vec<String>,
    /// Snapshot must carry all of these tags
    pub tags: Vec<String>,
    /// Snapshot must include all of these paths
    pub paths: Vec<String>,
}

impl SnapshotFilter {
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.tags.is_empty() && self.paths.is_empty()
    }

    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        if !self.hosts.is_empty() {
            match &snapshot.hostname {
                Some(host) if self.hosts.contains(host) => {}
                _ => return false,
            }
        }

        self.tags.iter().all(|t| snapshot.tags.contains(t))
            && self.paths.iter().all(|p| snapshot.paths.contains(p))
    }
}
