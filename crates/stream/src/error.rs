use std::io;

use chunkfs_store::StoreError;

use crate::mode::{ModeParseError, OpenMode};

/// Errors returned by [`ChunkFs`](crate::ChunkFs) and
/// [`FileHandle`](crate::FileHandle) operations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error(transparent)]
    Mode(#[from] ModeParseError),

    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("cannot write to {file}: opened in '{mode}' mode")]
    InvalidMode { file: String, mode: OpenMode },

    #[error("offset {requested} out of range for {file} (limit {limit})")]
    OutOfRange {
        file: String,
        requested: i128,
        limit: u64,
    },

    #[error("chunk {index} of {file} is missing from the store")]
    MissingChunk { file: String, index: u64 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("length mismatch on {file}: tracked {tracked} bytes, store holds {stored}")]
    ChecksumMismatch {
        file: String,
        tracked: u64,
        stored: u64,
    },

    #[error("handle for {0} is closed")]
    Closed(String),
}

impl FsError {
    fn io_kind(&self) -> io::ErrorKind {
        match self {
            FsError::Mode(_)
            | FsError::InvalidUri(_)
            | FsError::InvalidConfig(_)
            | FsError::OutOfRange { .. } => io::ErrorKind::InvalidInput,
            FsError::FileNotFound(_) => io::ErrorKind::NotFound,
            FsError::InvalidMode { .. } => io::ErrorKind::PermissionDenied,
            FsError::MissingChunk { .. } | FsError::ChecksumMismatch { .. } => {
                io::ErrorKind::InvalidData
            }
            FsError::Store(StoreError::Io(e)) => e.kind(),
            FsError::Store(StoreError::NotFound(_)) => io::ErrorKind::NotFound,
            FsError::Store(StoreError::AlreadyExists(_)) => io::ErrorKind::AlreadyExists,
            FsError::Store(_) | FsError::Closed(_) => io::ErrorKind::Other,
        }
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        match err {
            FsError::Store(StoreError::Io(e)) => e,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}
