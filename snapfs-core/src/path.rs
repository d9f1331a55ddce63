//! Filesystem path rules
//!
//! Paths are relative, slash separated and unrooted: `"."` names the root,
//! `2024-01-01T00:00:00Z/docs/a.txt` names a file inside a snapshot.
//! Empty, `.` and `..` elements are rejected rather than cleaned, as are
//! leading and trailing slashes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SnapError, SnapResult};

/// Check a path against the rules above
pub fn is_valid(path: &str) -> bool {
    if path == "." {
        return true;
    }
    if path.is_empty() || path.contains('\0') {
        return false;
    }
    path.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// Key of a tree inside a snapshot's tree cache: `""` for the root,
/// `"/docs"`, `"/docs/sub"` below it.
pub fn tree_key(parent: &str, name: &str) -> String {
    format!("{parent}/{name}")
}

/// A validated filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FsPath {
    segments: Vec<String>,
}

impl FsPath {
    pub fn parse(path: &str) -> SnapResult<Self> {
        if !is_valid(path) {
            return Err(SnapError::InvalidPath(path.to_string()));
        }
        if path == "." {
            return Ok(Self::root());
        }
        Ok(Self {
            segments: path.split('/').map(String::from).collect(),
        })
    }

    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First element: the snapshot name
    pub fn snapshot(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    /// Everything below the snapshot
    pub fn rest(&self) -> &[String] {
        self.segments.get(1..).unwrap_or(&[])
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn join(&self, name: &str) -> SnapResult<Self> {
        if !is_valid(name) || name == "." {
            return Err(SnapError::InvalidPath(name.to_string()));
        }
        let mut segments = self.segments.clone();
        segments.extend(name.split('/').map(String::from));
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            ".".to_string()
        } else {
            self.segments.join("/")
        }
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}
