//! Backing store for chunkfs: chunk records plus one metadata record per file.
//!
//! The file-handle engine never touches storage directly; it talks to a
//! [`ChunkStore`]. Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local, used by tests and embedders.
//! - [`LocalDirStore`]: one JSON document per file and one file per chunk
//!   under a root directory.

mod checksum;
mod local;
mod memory;
mod types;

pub use checksum::{checksum_bytes, checksum_chunks, try_checksum_chunks};
pub use local::LocalDirStore;
pub use memory::MemoryStore;
pub use types::{Chunk, ChunkId, FileId, FileMetadata, MetadataUpdate};

/// Errors produced by a chunk store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Contract between the file-handle engine and whatever persists chunks.
///
/// Every call is synchronous and returns before the next one starts.
/// Implementations take `&self` so one store can back many handles through
/// an `Arc`; they provide no coordination between those handles.
pub trait ChunkStore {
    /// Looks up a file's metadata by logical filename.
    fn find_metadata(&self, filename: &str) -> Result<Option<FileMetadata>, StoreError>;

    /// Creates an empty (length 0) file record.
    fn create_metadata(&self, filename: &str, chunk_size: u64)
    -> Result<FileMetadata, StoreError>;

    /// Applies `update` to the metadata of `file_id` in a single write.
    fn update_metadata(&self, file_id: &FileId, update: &MetadataUpdate) -> Result<(), StoreError>;

    fn delete_metadata(&self, file_id: &FileId) -> Result<(), StoreError>;

    fn find_chunk(&self, file_id: &FileId, index: u64) -> Result<Option<Chunk>, StoreError>;

    fn count_chunks(&self, file_id: &FileId) -> Result<u64, StoreError>;

    /// Inserts a new chunk record. Fails if `(file_id, index)` already exists.
    fn insert_chunk(
        &self,
        file_id: &FileId,
        index: u64,
        payload: &[u8],
    ) -> Result<ChunkId, StoreError>;

    /// Replaces the payload of an existing chunk record.
    fn update_chunk(&self, chunk_id: &ChunkId, payload: &[u8]) -> Result<(), StoreError>;

    /// Removes every chunk of `file_id`. Succeeds when there are none.
    fn delete_chunks(&self, file_id: &FileId) -> Result<(), StoreError>;

    /// MD5 (hex) of the concatenated payloads, ordered by chunk index.
    fn compute_checksum(&self, file_id: &FileId) -> Result<String, StoreError>;

    /// Sum of the payload sizes of every stored chunk of `file_id`.
    fn stored_length(&self, file_id: &FileId) -> Result<u64, StoreError>;
}

impl<S: ChunkStore + ?Sized> ChunkStore for std::sync::Arc<S> {
    fn find_metadata(&self, filename: &str) -> Result<Option<FileMetadata>, StoreError> {
        (**self).find_metadata(filename)
    }

    fn create_metadata(
        &self,
        filename: &str,
        chunk_size: u64,
    ) -> Result<FileMetadata, StoreError> {
        (**self).create_metadata(filename, chunk_size)
    }

    fn update_metadata(&self, file_id: &FileId, update: &MetadataUpdate) -> Result<(), StoreError> {
        (**self).update_metadata(file_id, update)
    }

    fn delete_metadata(&self, file_id: &FileId) -> Result<(), StoreError> {
        (**self).delete_metadata(file_id)
    }

    fn find_chunk(&self, file_id: &FileId, index: u64) -> Result<Option<Chunk>, StoreError> {
        (**self).find_chunk(file_id, index)
    }

    fn count_chunks(&self, file_id: &FileId) -> Result<u64, StoreError> {
        (**self).count_chunks(file_id)
    }

    fn insert_chunk(
        &self,
        file_id: &FileId,
        index: u64,
        payload: &[u8],
    ) -> Result<ChunkId, StoreError> {
        (**self).insert_chunk(file_id, index, payload)
    }

    fn update_chunk(&self, chunk_id: &ChunkId, payload: &[u8]) -> Result<(), StoreError> {
        (**self).update_chunk(chunk_id, payload)
    }

    fn delete_chunks(&self, file_id: &FileId) -> Result<(), StoreError> {
        (**self).delete_chunks(file_id)
    }

    fn compute_checksum(&self, file_id: &FileId) -> Result<String, StoreError> {
        (**self).compute_checksum(file_id)
    }

    fn stored_length(&self, file_id: &FileId) -> Result<u64, StoreError> {
        (**self).stored_length(file_id)
    }
}
