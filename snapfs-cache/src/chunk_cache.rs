// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared chunk cache
//!
//! Maps chunk ids to their decoded bytes under a total byte budget, evicting
//! the least recently *accessed* chunks first. One cache is shared by every
//! open file of a filesystem.
//!
//! Over-budget policy: a single chunk larger than the whole budget is still
//! stored. Everything else is evicted to make room and the cache stays over
//! budget until that chunk is itself evicted by the next insertion.

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use snapfs_core::ChunkId;
use tracing::trace;

use crate::{CacheConfig, CacheStats};

struct Inner {
    entries: LruCache<ChunkId, Bytes>,
    size: u64,
    hits: u64,
    misses: u64,
}

/// Byte-budgeted LRU cache of chunk contents
pub struct ChunkCache {
    max_size: u64,
    inner: Mutex<Inner>,
}

impl ChunkCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            max_size: config.max_size,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                size: 0,
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn with_capacity(max_size: u64) -> Self {
        Self::new(CacheConfig::with_max_size(max_size))
    }

    /// Look up a chunk, marking it as recently used.
    ///
    /// The returned bytes stay valid even if the chunk is evicted right
    /// after.
    pub fn get(&self, id: &ChunkId) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        match inner.entries.get(id).cloned() {
            Some(data) => {
                inner.hits += 1;
                trace!(chunk = %id.short(), "chunk cache hit");
                Some(data)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a chunk, evicting least recently used chunks until it fits
    pub fn add(&self, id: ChunkId, data: Bytes) {
        let len = data.len() as u64;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(old) = inner.entries.pop(&id) {
            inner.size -= old.len() as u64;
        }

        while inner.size + len > self.max_size {
            match inner.entries.pop_lru() {
                Some((evicted, bytes)) => {
                    inner.size -= bytes.len() as u64;
                    trace!(chunk = %evicted.short(), size = bytes.len(), "chunk evicted");
                }
                None => break,
            }
        }

        inner.entries.put(id, data);
        inner.size += len;
    }

    /// Presence check that does not touch recency
    pub fn contains(&self, id: &ChunkId) -> bool {
        self.inner.lock().entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Configured byte budget
    pub fn capacity(&self) -> u64 {
        self.max_size
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len() as u64,
            total_size: inner.size,
            hit_count: inner.hits,
            miss_count: inner.misses,
        }
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
