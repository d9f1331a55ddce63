//! File system entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Node;

/// Mode bits reported for every directory
pub const DIR_MODE: u32 = 0o755;
/// Mode bits reported for every file
pub const FILE_MODE: u32 = 0o444;

/// Metadata of one file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    /// Unix permission bits
    pub mode: u32,
    /// Always `None`: the repository keeps no per-entry mtimes
    pub modified: Option<DateTime<Utc>>,
}

impl EntryInfo {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            is_dir: false,
            mode: FILE_MODE,
            modified: None,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            is_dir: true,
            mode: DIR_MODE,
            modified: None,
        }
    }

    /// Listing entry for a tree node, using its declared size
    pub fn from_node(node: &Node) -> Self {
        if node.is_dir() {
            Self::directory(&node.name)
        } else {
            Self::file(&node.name, node.size)
        }
    }

    /// `ls -l` style mode string
    pub fn mode_string(&self) -> String {
        let mut s = String::with_capacity(10);
        s.push(if self.is_dir { 'd' } else { '-' });
        for shift in [6, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        s
    }
}

/// An open directory
///
/// Entries are materialized when the directory is opened and handed out in
/// order. Once exhausted the listing cannot be rewound; open the directory
/// again instead.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    info: EntryInfo,
    entries: Vec<EntryInfo>,
    offset: usize,
}

impl DirectoryListing {
    pub fn new(info: EntryInfo, entries: Vec<EntryInfo>) -> Self {
        Self {
            info,
            entries,
            offset: 0,
        }
    }

    pub fn stat(&self) -> EntryInfo {
        self.info.clone()
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Entries not yet handed out
    pub fn remaining(&self) -> usize {
        self.entries.len() - self.offset
    }

    /// Next batch of entries.
    ///
    /// With `count > 0`, returns at most `count` entries and `None` once the
    /// listing is exhausted. With `count == 0`, returns everything left
    /// (possibly empty) and never signals end of stream.
    pub fn read_dir(&mut self, count: usize) -> Option<Vec<EntryInfo>> {
        let mut n = self.remaining();
        if n == 0 && count > 0 {
            return None;
        }
        if count > 0 && n > count {
            n = count;
        }

        let batch = self.entries[self.offset..self.offset + n].to_vec();
        self.offset += n;
        Some(batch)
    }

    /// Everything left, consuming the listing
    pub fn into_entries(mut self) -> Vec<EntryInfo> {
        self.entries.split_off(self.offset)
    }
}
