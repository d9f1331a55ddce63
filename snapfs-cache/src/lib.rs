//! Chunk caching layer for snapfs
//!
//! A single in-memory, byte-budgeted LRU cache of decoded chunk contents,
//! shared across all open files so that hot chunks are fetched from the
//! repository once.

mod chunk_cache;
pub mod config;

pub use chunk_cache::ChunkCache;
pub use config::{parse_size, CacheConfig, DEFAULT_CACHE_SIZE};

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: u64,
    pub total_size: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 { 0.0 } else { self.hit_count as f64 / total as f64 }
    }
}
