//! Random-access reads over chunked files
//!
//! A file's content is the concatenation of its chunks. Opening a file
//! looks up every chunk's size in the repository index and builds a prefix
//! sum over them; a read then binary-searches the starting chunk and
//! stitches bytes from consecutive chunks, going through the shared
//! [`ChunkCache`] before the repository.
//!
//! The indexed sizes win over the node's declared size: when they
//! disagree, the summed size is what `stat`, `seek` and end-of-file use.

use bytes::Bytes;
use snapfs_cache::ChunkCache;
use snapfs_core::{
    BlobKind, ChunkId, Context, EntryInfo, Node, NodeKind, Repository, ResultExt, SnapError,
    SnapResult,
};
use std::io::SeekFrom;
use std::sync::Arc;
use tracing::debug;

/// Prefix sums over chunk sizes: `offsets[0] == 0`,
/// `offsets[i] == offsets[i - 1] + size(chunk[i - 1])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeIndex {
    offsets: Vec<u64>,
}

impl CumulativeIndex {
    pub fn from_sizes(sizes: impl IntoIterator<Item = u64>) -> Self {
        let mut offsets = vec![0];
        let mut total = 0u64;
        for size in sizes {
            total += size;
            offsets.push(total);
        }
        Self { offsets }
    }

    /// Sum of all chunk sizes
    pub fn total(&self) -> u64 {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn chunk_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Chunk holding byte `offset`, and the offset within that chunk.
    /// `None` at or past the end.
    pub fn locate(&self, offset: u64) -> Option<(usize, u64)> {
        if offset >= self.total() {
            return None;
        }
        // first index whose prefix sum exceeds offset, minus one
        let chunk = self.offsets.partition_point(|&c| c <= offset) - 1;
        Some((chunk, offset - self.offsets[chunk]))
    }
}

/// An open regular file
///
/// [`read_at`](Self::read_at) takes `&self`, never touches the cursor and
/// may run concurrently from several tasks. [`read`](Self::read) and
/// [`seek`](Self::seek) move the cursor and need `&mut self`.
pub struct FileReader {
    name: String,
    content: Vec<ChunkId>,
    index: CumulativeIndex,
    declared_size: u64,
    offset: u64,
    ctx: Context,
    repo: Arc<dyn Repository>,
    cache: Arc<ChunkCache>,
}

impl FileReader {
    /// Open `node`, indexing its chunk sizes.
    ///
    /// Fails with `ChunkSizeUnindexed` when any chunk is missing from the
    /// repository index.
    pub async fn open(
        ctx: &Context,
        repo: Arc<dyn Repository>,
        cache: Arc<ChunkCache>,
        node: &Node,
    ) -> SnapResult<Self> {
        let content = match &node.kind {
            NodeKind::File { content } => content.clone(),
            NodeKind::Directory { .. } => return Err(SnapError::IsADirectory(node.name.clone())),
            NodeKind::Other { type_name } => {
                return Err(SnapError::UnsupportedNodeType {
                    path: node.name.clone(),
                    type_name: type_name.clone(),
                })
            }
        };

        debug!(name = %node.name, chunks = content.len(), "open file");

        let mut sizes = Vec::with_capacity(content.len());
        for id in &content {
            match repo.lookup_chunk_size(ctx, id, BlobKind::Data).await? {
                Some(size) => sizes.push(size),
                None => {
                    return Err(SnapError::ChunkSizeUnindexed(*id))
                        .with_context(|| format!("open {}", node.name))
                }
            }
        }
        let index = CumulativeIndex::from_sizes(sizes);

        if index.total() != node.size {
            debug!(
                name = %node.name,
                declared = node.size,
                actual = index.total(),
                "sizes do not match, using real size"
            );
        }

        Ok(Self {
            name: node.name.clone(),
            content,
            index,
            declared_size: node.size,
            offset: 0,
            ctx: ctx.clone(),
            repo,
            cache,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective size: the sum of the indexed chunk sizes
    pub fn size(&self) -> u64 {
        self.index.total()
    }

    /// Size recorded in the tree node, possibly wrong
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn chunk_count(&self) -> usize {
        self.content.len()
    }

    /// Cursor used by `read`
    pub fn position(&self) -> u64 {
        self.offset
    }

    pub fn stat(&self) -> EntryInfo {
        EntryInfo::file(&self.name, self.size())
    }

    async fn chunk(&self, i: usize) -> SnapResult<Bytes> {
        let id = &self.content[i];
        if let Some(data) = self.cache.get(id) {
            return Ok(data);
        }

        let data = self
            .repo
            .load_chunk(&self.ctx, BlobKind::Data, id)
            .await
            .with_context(|| format!("load chunk {} of {}", id.short(), self.name))?;

        self.cache.add(*id, data.clone());
        Ok(data)
    }

    /// Fill `buf` with bytes starting at `offset`.
    ///
    /// Returns the number of bytes copied; `Ok(0)` means end of file (or an
    /// empty `buf`). Fewer bytes than `buf.len()` is a valid short read.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> SnapResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some((start, mut skip)) = self.index.locate(offset) else {
            return Ok(0);
        };

        let mut copied = 0;
        for i in start..self.content.len() {
            if copied == buf.len() {
                break;
            }

            let chunk = self.chunk(i).await?;
            let data: &[u8] = if skip > 0 {
                let from = (skip as usize).min(chunk.len());
                skip = 0;
                &chunk[from..]
            } else {
                &chunk
            };

            let n = data.len().min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&data[..n]);
            copied += n;
        }

        Ok(copied)
    }

    /// Read at the cursor and advance it
    pub async fn read(&mut self, buf: &mut [u8]) -> SnapResult<usize> {
        let n = self.read_at(buf, self.offset).await?;
        self.offset += n as u64;
        Ok(n)
    }

    /// Move the cursor. Positions past the end are allowed and read as end
    /// of file; negative positions fail and leave the cursor unchanged.
    pub fn seek(&mut self, pos: SeekFrom) -> SnapResult<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.offset) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size()) + i128::from(delta),
        };

        if target < 0 {
            return Err(SnapError::InvalidArgument(format!(
                "seek to negative offset {target} in {}",
                self.name
            )));
        }
        self.offset = u64::try_from(target).map_err(|_| {
            SnapError::InvalidArgument(format!(
                "seek offset {target} out of range in {}",
                self.name
            ))
        })?;
        Ok(self.offset)
    }
}

impl std::fmt::Debug for FileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("chunks", &self.content.len())
            .field("offset", &self.offset)
            .finish()
    }
}
