use chunkfs_store::{Chunk, ChunkId};

/// Maps byte offsets onto fixed-size chunks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkLayout {
    chunk_size: u64,
}

impl ChunkLayout {
    pub fn new(chunk_size: u64) -> Self {
        debug_assert!(chunk_size > 0);
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunk_index_of(&self, offset: u64) -> u64 {
        offset / self.chunk_size
    }

    pub fn within_chunk_offset(&self, offset: u64) -> usize {
        (offset % self.chunk_size) as usize
    }

    pub fn chunk_start(&self, index: u64) -> u64 {
        index * self.chunk_size
    }
}

/// The one chunk a handle holds in memory.
///
/// `buf.len()` is the chunk's valid length. `record` is `None` until the
/// chunk has been inserted into the store.
#[derive(Debug)]
pub(crate) struct ChunkCache {
    index: u64,
    record: Option<ChunkId>,
    buf: Vec<u8>,
    dirty: bool,
}

impl ChunkCache {
    pub fn loaded(chunk: Chunk) -> Self {
        Self {
            index: chunk.index,
            record: Some(chunk.id),
            buf: chunk.payload,
            dirty: false,
        }
    }

    pub fn fresh(index: u64) -> Self {
        Self {
            index,
            record: None,
            buf: Vec::new(),
            dirty: false,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn record(&self) -> Option<&ChunkId> {
        self.record.as_ref()
    }

    pub fn valid_len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf
    }

    /// Copies bytes starting at `pos` into `out`, stopping at the valid
    /// length; returns how many.
    pub fn read_into(&self, pos: usize, out: &mut [u8]) -> usize {
        if pos >= self.buf.len() {
            return 0;
        }
        let n = out.len().min(self.buf.len() - pos);
        out[..n].copy_from_slice(&self.buf[pos..pos + n]);
        n
    }

    /// Copies `data` in at `pos`, zero-filling any gap past the valid length.
    pub fn splice(&mut self, pos: usize, data: &[u8]) {
        let end = pos + data.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[pos..end].copy_from_slice(data);
        self.dirty = true;
    }

    pub fn mark_persisted(&mut self, record: ChunkId) {
        self.record = Some(record);
        self.dirty = false;
    }
}
