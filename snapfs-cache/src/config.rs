// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cache configuration

use bytesize::ByteSize;
use serde::{Deserialize, Deserializer, Serialize};

/// Default chunk cache budget (64 MiB)
pub const DEFAULT_CACHE_SIZE: u64 = 64 << 20;

/// Chunk cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total byte budget. Accepts a number of bytes or a size such as
    /// `"128MiB"`.
    #[serde(deserialize_with = "deserialize_size")]
    pub max_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn with_max_size(max_size: u64) -> Self {
        Self { max_size }
    }
}

/// Parse `"4096"`, `"64MiB"`, `"1 GB"` into bytes
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }
    s.parse::<ByteSize>()
        .map(|b| b.as_u64())
        .map_err(|e| format!("invalid size {s:?}: {e}"))
}

fn deserialize_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Bytes(u64),
        Human(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Bytes(n) => Ok(n),
        Size::Human(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}
