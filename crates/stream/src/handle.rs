use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use chunkfs_store::{ChunkStore, FileId, FileMetadata, MetadataUpdate};
use serde::{Deserialize, Serialize};

use crate::FsError;
use crate::cache::{ChunkCache, ChunkLayout};
use crate::mode::OpenMode;

/// Size, chunk size and checksum of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u64,
    pub chunk_size: u64,
    /// `None` until a writable handle has closed the file.
    pub checksum: Option<String>,
}

/// An open file: a byte offset plus one buffered chunk.
///
/// Reads and writes go through the buffered chunk. Moving to a byte in a
/// different chunk flushes the buffer first (writable modes only) and then
/// loads the target chunk, or starts an empty one when the store has none.
///
/// Dropping a handle does not flush. Call [`close`](Self::close) to persist
/// buffered data and commit length and checksum.
pub struct FileHandle<S: ChunkStore> {
    store: Arc<S>,
    filename: String,
    file_id: FileId,
    mode: OpenMode,
    layout: ChunkLayout,
    strict_length_check: bool,
    /// Highest end offset known to be persisted.
    length: u64,
    total_chunks: u64,
    checksum: Option<String>,
    offset: u64,
    cache: Option<ChunkCache>,
    closed: bool,
}

impl<S: ChunkStore> FileHandle<S> {
    pub(crate) fn new(
        store: Arc<S>,
        meta: FileMetadata,
        mode: OpenMode,
        total_chunks: u64,
        strict_length_check: bool,
    ) -> Self {
        Self {
            store,
            filename: meta.filename,
            file_id: meta.file_id,
            mode,
            layout: ChunkLayout::new(meta.chunk_size),
            strict_length_check,
            length: meta.length,
            total_chunks,
            checksum: meta.checksum,
            offset: 0,
            cache: None,
            closed: false,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn chunk_size(&self) -> u64 {
        self.layout.chunk_size()
    }

    /// Number of chunks this handle knows to exist in the store.
    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    /// Whether the buffered chunk holds changes not yet in the store.
    pub fn is_dirty(&self) -> bool {
        self.cache.as_ref().is_some_and(ChunkCache::is_dirty)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current byte offset.
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// True once the offset has reached the end of the file.
    pub fn eof(&self) -> bool {
        self.offset >= self.live_len()
    }

    /// Size as seen through this handle, including unflushed writes.
    pub fn stat(&self) -> FileStat {
        FileStat {
            size: self.live_len(),
            chunk_size: self.layout.chunk_size(),
            checksum: self.checksum.clone(),
        }
    }

    /// Moves the offset, switching the buffered chunk when the target lies
    /// in a different one.
    ///
    /// Read handles may seek up to the file length. Writable handles may go
    /// up to one chunk plus one byte past it; the gap is zero-filled when
    /// data is written there. On error the offset is unchanged.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        self.ensure_open()?;
        let limit = self.seek_limit();
        let requested = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.offset) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.live_len()) + i128::from(delta),
        };
        if requested < 0 || requested > i128::from(limit) {
            return Err(FsError::OutOfRange {
                file: self.filename.clone(),
                requested,
                limit,
            });
        }
        let target = requested as u64;
        self.ensure_chunk_at(target)?;
        self.offset = target;
        Ok(target)
    }

    /// Reads up to `n` bytes from the current offset, crossing chunk
    /// boundaries as needed. Returns fewer bytes at end of file.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>, FsError> {
        self.ensure_open()?;
        let mut out = vec![0; self.readable(n)];
        let got = self.read_into(&mut out)?;
        out.truncate(got);
        Ok(out)
    }

    /// Fills `buf` from the current offset without an intermediate
    /// allocation. Returns the number of bytes copied, 0 at end of file.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        self.ensure_open()?;
        let want = self.readable(buf.len());
        let mut filled = 0;
        while filled < want {
            if let Err(err) = self.ensure_chunk_at(self.offset) {
                if filled == 0 {
                    return Err(err);
                }
                tracing::debug!(file = %self.filename, read = filled, error = %err, "short read");
                break;
            }
            let Some(cache) = self.cache.as_ref() else {
                break;
            };
            let pos = self.layout.within_chunk_offset(self.offset);
            let copied = cache.read_into(pos, &mut buf[filled..want]);
            if copied == 0 {
                break;
            }
            filled += copied;
            self.offset += copied as u64;
        }
        Ok(filled)
    }

    fn readable(&self, n: usize) -> usize {
        let available = self.live_len().saturating_sub(self.offset);
        usize::try_from(available).map_or(n, |available| available.min(n))
    }

    /// Writes `data` at the current offset, crossing chunk boundaries as
    /// needed, and returns the number of bytes accepted.
    ///
    /// If switching chunks fails part way, the bytes already accepted are
    /// reported and the error surfaces on the next call.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        self.ensure_open()?;
        if !self.mode.is_writable() {
            return Err(FsError::InvalidMode {
                file: self.filename.clone(),
                mode: self.mode,
            });
        }
        let chunk_size = self.layout.chunk_size() as usize;
        let mut written = 0;
        while written < data.len() {
            if let Err(err) = self.ensure_chunk_at(self.offset) {
                if written == 0 {
                    return Err(err);
                }
                tracing::warn!(file = %self.filename, written, error = %err, "short write");
                break;
            }
            let Some(cache) = self.cache.as_mut() else {
                break;
            };
            let pos = self.layout.within_chunk_offset(self.offset);
            let take = (chunk_size - pos).min(data.len() - written);
            cache.splice(pos, &data[written..written + take]);
            written += take;
            self.offset += take as u64;
        }
        Ok(written)
    }

    /// Persists the buffered chunk if it is dirty. Flushing a clean buffer
    /// does not touch the store.
    pub fn flush(&mut self) -> Result<(), FsError> {
        self.ensure_open()?;
        self.flush_cache()
    }

    /// Flushes, then records the file's length and checksum in its metadata.
    ///
    /// The committed length is the byte sum of the stored chunks. A mismatch
    /// with the tracked length is logged, or returned as
    /// [`FsError::ChecksumMismatch`] when strict length checking is on. The
    /// handle stays open if close fails, so it can be retried.
    pub fn close(&mut self) -> Result<(), FsError> {
        self.ensure_open()?;
        if self.mode.is_writable() {
            self.commit()?;
        }
        self.closed = true;
        self.cache = None;
        tracing::debug!(file = %self.filename, mode = %self.mode, length = self.length, "closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), FsError> {
        if self.closed {
            return Err(FsError::Closed(self.filename.clone()));
        }
        Ok(())
    }

    fn live_len(&self) -> u64 {
        match &self.cache {
            Some(cache) if cache.is_dirty() => {
                let end = self.layout.chunk_start(cache.index()) + cache.valid_len() as u64;
                self.length.max(end)
            }
            _ => self.length,
        }
    }

    fn seek_limit(&self) -> u64 {
        let len = self.live_len();
        if self.mode.is_writable() {
            len.saturating_add(self.layout.chunk_size() + 1)
        } else {
            len
        }
    }

    fn ensure_chunk_at(&mut self, offset: u64) -> Result<(), FsError> {
        let index = self.layout.chunk_index_of(offset);
        if self.cache.as_ref().map(ChunkCache::index) != Some(index) {
            self.switch_chunk(index, offset)?;
        }
        Ok(())
    }

    fn switch_chunk(&mut self, index: u64, target: u64) -> Result<(), FsError> {
        self.flush_cache()?;
        let cache = match self.store.find_chunk(&self.file_id, index)? {
            Some(chunk) => ChunkCache::loaded(chunk),
            None if self.mode.is_writable() => ChunkCache::fresh(index),
            // End of a chunk-aligned (or empty) file: nothing to load.
            None if target == self.length && self.layout.within_chunk_offset(target) == 0 => {
                ChunkCache::fresh(index)
            }
            None => {
                return Err(FsError::MissingChunk {
                    file: self.filename.clone(),
                    index,
                });
            }
        };
        tracing::trace!(file = %self.filename, chunk = index, new = cache.record().is_none(), "switched chunk");
        self.cache = Some(cache);
        Ok(())
    }

    fn flush_cache(&mut self) -> Result<(), FsError> {
        let (index, is_new) = match &self.cache {
            Some(cache) if cache.is_dirty() => (cache.index(), cache.record().is_none()),
            _ => return Ok(()),
        };
        if is_new {
            self.fill_gap_below(index)?;
        }
        let Some(cache) = self.cache.as_mut() else {
            return Ok(());
        };
        let end = self.layout.chunk_start(index) + cache.valid_len() as u64;
        match cache.record().cloned() {
            Some(record) => {
                self.store.update_chunk(&record, cache.payload())?;
                cache.mark_persisted(record);
                if index + 1 >= self.total_chunks {
                    self.length = end;
                } else {
                    self.length = self.length.max(end);
                }
            }
            None => {
                let record = self
                    .store
                    .insert_chunk(&self.file_id, index, cache.payload())?;
                cache.mark_persisted(record);
                self.total_chunks = self.total_chunks.max(index + 1);
                self.length = self.length.max(end);
            }
        }
        tracing::debug!(file = %self.filename, chunk = index, inserted = is_new, length = self.length, "flushed chunk");
        Ok(())
    }

    /// Pads every chunk below `index` to full size so no file has a hole.
    fn fill_gap_below(&mut self, index: u64) -> Result<(), FsError> {
        let first = self.layout.chunk_index_of(self.length);
        if first >= index {
            return Ok(());
        }
        let chunk_size = self.layout.chunk_size() as usize;
        let zeros = vec![0u8; chunk_size];
        for i in first..index {
            match self.store.find_chunk(&self.file_id, i)? {
                Some(chunk) if chunk.payload.len() >= chunk_size => {}
                Some(mut chunk) => {
                    chunk.payload.resize(chunk_size, 0);
                    self.store.update_chunk(&chunk.id, &chunk.payload)?;
                }
                None => {
                    self.store.insert_chunk(&self.file_id, i, &zeros)?;
                    self.total_chunks = self.total_chunks.max(i + 1);
                }
            }
        }
        self.length = self.length.max(self.layout.chunk_start(index));
        tracing::debug!(file = %self.filename, from = first, to = index, "zero-filled gap");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), FsError> {
        self.flush_cache()?;
        let checksum = self.store.compute_checksum(&self.file_id)?;
        let stored = self.store.stored_length(&self.file_id)?;
        if stored != self.length {
            if self.strict_length_check {
                return Err(FsError::ChecksumMismatch {
                    file: self.filename.clone(),
                    tracked: self.length,
                    stored,
                });
            }
            tracing::warn!(
                file = %self.filename,
                tracked = self.length,
                stored,
                "tracked length disagrees with stored chunks, committing stored length"
            );
            self.length = stored;
        }
        let update = MetadataUpdate::default()
            .length(stored)
            .checksum(checksum.clone());
        self.store.update_metadata(&self.file_id, &update)?;
        self.checksum = Some(checksum);
        Ok(())
    }
}

impl<S: ChunkStore> Drop for FileHandle<S> {
    fn drop(&mut self) {
        if !self.closed && self.is_dirty() {
            tracing::warn!(
                file = %self.filename,
                offset = self.offset,
                "handle dropped with unflushed data"
            );
        }
    }
}

impl<S: ChunkStore> fmt::Debug for FileHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("filename", &self.filename)
            .field("mode", &self.mode)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("dirty", &self.is_dirty())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkfs_store::MemoryStore;

    fn handle(store: &Arc<MemoryStore>, mode: OpenMode, chunk_size: u64) -> FileHandle<MemoryStore> {
        let meta = match store.find_metadata("/t").unwrap() {
            Some(meta) => meta,
            None => store.create_metadata("/t", chunk_size).unwrap(),
        };
        let total = store.count_chunks(&meta.file_id).unwrap();
        let mut h = FileHandle::new(Arc::clone(store), meta, mode, total, false);
        h.seek(SeekFrom::Start(0)).unwrap();
        h
    }

    #[test]
    fn writes_stay_buffered_until_chunk_switch() {
        let store = Arc::new(MemoryStore::new());
        let mut h = handle(&store, OpenMode::ReadWrite, 4);
        h.write(b"abc").unwrap();
        assert!(h.is_dirty());
        assert_eq!(store.chunk_record_count(), 0);
        assert_eq!(h.stat().size, 3);

        h.write(b"de").unwrap();
        assert_eq!(store.chunk_record_count(), 1);
        assert_eq!(h.total_chunks(), 1);
        assert_eq!(h.tell(), 5);
    }

    #[test]
    fn flush_pads_short_tail_before_new_chunk() {
        let store = Arc::new(MemoryStore::new());
        let mut h = handle(&store, OpenMode::ReadWrite, 4);
        h.write(b"ab").unwrap();
        h.flush().unwrap();
        h.seek(SeekFrom::Start(7)).unwrap();
        h.write(b"z").unwrap();
        h.flush().unwrap();
        assert_eq!(h.stat().size, 8);

        // A whole missing chunk in between is inserted as zeros.
        h.seek(SeekFrom::Start(13)).unwrap();
        h.write(b"y").unwrap();
        h.flush().unwrap();

        let id = store.find_metadata("/t").unwrap().unwrap().file_id;
        let payload = |i| store.find_chunk(&id, i).unwrap().unwrap().payload;
        assert_eq!(payload(0), b"ab\0\0");
        assert_eq!(payload(1), b"\0\0\0z");
        assert_eq!(payload(2), b"\0\0\0\0");
        assert_eq!(payload(3), b"\0y");
        assert_eq!(h.stat().size, 14);
        assert_eq!(h.total_chunks(), 4);
    }

    #[test]
    fn read_handle_rejects_writes() {
        let store = Arc::new(MemoryStore::new());
        let mut h = handle(&store, OpenMode::Read, 4);
        let err = h.write(b"x").unwrap_err();
        assert!(matches!(err, FsError::InvalidMode { mode: OpenMode::Read, .. }));
        assert_eq!(h.tell(), 0);
    }

    #[test]
    fn closed_handle_rejects_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut h = handle(&store, OpenMode::ReadWrite, 4);
        h.close().unwrap();
        assert!(h.is_closed());
        assert!(matches!(h.read(1), Err(FsError::Closed(_))));
        assert!(matches!(h.write(b"x"), Err(FsError::Closed(_))));
        assert!(matches!(h.seek(SeekFrom::Start(0)), Err(FsError::Closed(_))));
        assert!(matches!(h.flush(), Err(FsError::Closed(_))));
        assert!(matches!(h.close(), Err(FsError::Closed(_))));
    }

    #[test]
    fn seek_relative_and_from_end() {
        let store = Arc::new(MemoryStore::new());
        let mut h = handle(&store, OpenMode::ReadWrite, 4);
        h.write(b"0123456789").unwrap();
        assert_eq!(h.seek(SeekFrom::End(-3)).unwrap(), 7);
        assert_eq!(h.seek(SeekFrom::Current(-5)).unwrap(), 2);
        assert_eq!(h.read(3).unwrap(), b"234");

        let err = h.seek(SeekFrom::Current(-10)).unwrap_err();
        assert!(matches!(err, FsError::OutOfRange { requested: -5, .. }));
        assert_eq!(h.tell(), 5);
    }

    #[test]
    fn debug_output_names_file() {
        let store = Arc::new(MemoryStore::new());
        let h = handle(&store, OpenMode::Read, 4);
        let text = format!("{h:?}");
        assert!(text.contains("\"/t\""));
        assert!(text.contains("Read"));
    }
}
