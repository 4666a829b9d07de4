//! Moves whole files between the local filesystem and a [`ChunkFs`].
//!
//! [`ChunkFs`]: chunkfs_stream::ChunkFs

mod copy;
mod validation;

pub use copy::{calculate_file_checksum, download_file, upload_file, verify_file};
pub use validation::local_path_for;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fs(#[from] chunkfs_stream::FsError),

    #[error("checksum mismatch for {uri}: local {local}, stored {stored}")]
    ChecksumMismatch {
        uri: String,
        local: String,
        stored: String,
    },

    #[error("no checksum recorded for {0}")]
    MissingChecksum(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
