use std::io::SeekFrom;
use std::sync::Arc;

use chunkfs_store::{ChunkStore, MetadataUpdate};

use crate::handle::{FileHandle, FileStat};
use crate::mode::OpenMode;
use crate::uri::logical_filename;
use crate::{FsConfig, FsError};

/// Entry point: opens, stats and deletes files in a chunk store.
pub struct ChunkFs<S: ChunkStore> {
    store: Arc<S>,
    config: FsConfig,
}

impl<S: ChunkStore> ChunkFs<S> {
    pub fn new(store: S, config: FsConfig) -> Result<Self, FsError> {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Builds a filesystem over a store that other code also holds.
    pub fn with_shared_store(store: Arc<S>, config: FsConfig) -> Result<Self, FsError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Opens `uri` with an fopen-style mode string.
    pub fn open(&self, uri: &str, mode: &str) -> Result<FileHandle<S>, FsError> {
        let mode = OpenMode::parse(mode)?;
        self.open_with(uri, mode)
    }

    /// Opens `uri` in `mode`.
    ///
    /// - `Read` needs an existing file.
    /// - `Write` truncates an existing file to zero bytes or creates it.
    /// - `ReadWrite` and `Append` keep content and create the file if absent.
    ///
    /// The handle is positioned at offset 0, or at end of file for `Append`.
    pub fn open_with(&self, uri: &str, mode: OpenMode) -> Result<FileHandle<S>, FsError> {
        let filename = logical_filename(uri)?;
        let existing = self.store.find_metadata(&filename)?;
        if let Some(meta) = &existing {
            check_chunk_size(&filename, meta.chunk_size)?;
        }
        let meta = match existing {
            Some(mut meta) if mode.truncates() => {
                let update = MetadataUpdate::default().length(0).clear_checksum();
                self.store.update_metadata(&meta.file_id, &update)?;
                self.store.delete_chunks(&meta.file_id)?;
                update.apply(&mut meta);
                tracing::debug!(file = %filename, "truncated");
                meta
            }
            Some(meta) => meta,
            None if mode.is_writable() => {
                let meta = self
                    .store
                    .create_metadata(&filename, self.config.chunk_size)?;
                tracing::debug!(file = %filename, chunk_size = meta.chunk_size, "created");
                meta
            }
            None => return Err(FsError::FileNotFound(filename)),
        };

        let total_chunks = self.store.count_chunks(&meta.file_id)?;
        let mut handle = FileHandle::new(
            Arc::clone(&self.store),
            meta,
            mode,
            total_chunks,
            self.config.strict_length_check,
        );
        let start = match mode {
            OpenMode::Append => SeekFrom::End(0),
            _ => SeekFrom::Start(0),
        };
        handle.seek(start)?;
        tracing::debug!(file = %filename, %mode, offset = handle.tell(), "opened");
        Ok(handle)
    }

    /// Reports the committed size, chunk size and checksum of `uri`.
    pub fn stat(&self, uri: &str) -> Result<FileStat, FsError> {
        let filename = logical_filename(uri)?;
        let meta = self
            .store
            .find_metadata(&filename)?
            .ok_or(FsError::FileNotFound(filename))?;
        Ok(FileStat {
            size: meta.length,
            chunk_size: meta.chunk_size,
            checksum: meta.checksum,
        })
    }

    pub fn exists(&self, uri: &str) -> Result<bool, FsError> {
        let filename = logical_filename(uri)?;
        Ok(self.store.find_metadata(&filename)?.is_some())
    }

    /// Removes the metadata record of `uri`, then all of its chunks.
    pub fn delete(&self, uri: &str) -> Result<(), FsError> {
        let filename = logical_filename(uri)?;
        let meta = self
            .store
            .find_metadata(&filename)?
            .ok_or_else(|| FsError::FileNotFound(filename.clone()))?;
        self.store.delete_metadata(&meta.file_id)?;
        self.store.delete_chunks(&meta.file_id)?;
        tracing::info!(file = %filename, length = meta.length, "deleted");
        Ok(())
    }
}

/// Rejects a stored chunk size the handle cannot work with.
fn check_chunk_size(filename: &str, chunk_size: u64) -> Result<(), FsError> {
    if chunk_size > 0 && usize::try_from(chunk_size).is_ok() {
        return Ok(());
    }
    Err(chunkfs_store::StoreError::Corrupt(format!("{filename} has chunk size {chunk_size}")).into())
}
