//! Filesystem configuration
//!
//! ```toml
//! [cache]
//! max_size = "128MiB"
//!
//! [filter]
//! hosts = ["laptop"]
//! tags = ["daily"]
//! ```

use serde::{Deserialize, Serialize};
use snapfs_cache::CacheConfig;
use snapfs_core::{SnapError, SnapResult, SnapshotFilter};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    pub cache: CacheConfig,
    /// Which snapshots appear at the top level
    pub filter: SnapshotFilter,
}

impl VfsConfig {
    pub fn from_toml_str(s: &str) -> SnapResult<Self> {
        toml::from_str(s).map_err(|e| SnapError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SnapResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SnapError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SnapResult<String> {
        toml::to_string_pretty(self).map_err(|e| SnapError::Config(e.to_string()))
    }
}
