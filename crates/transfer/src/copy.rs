use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chunkfs_store::ChunkStore;
use chunkfs_stream::ChunkFs;
use md5::{Digest, Md5};

use crate::TransferError;

/// Computes MD5 of an entire local file and returns the hex-encoded digest.
///
/// Matches the checksum a store records for the same bytes.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Copies `local` into the store as `uri`, replacing any existing content.
/// Returns the number of bytes copied.
pub fn upload_file<S: ChunkStore>(
    fs: &ChunkFs<S>,
    local: &Path,
    uri: &str,
) -> Result<u64, TransferError> {
    let mut src = File::open(local)?;
    let mut dst = fs.open(uri, "w")?;
    let copied = io::copy(&mut src, &mut dst)?;
    dst.close()?;
    tracing::info!(local = %local.display(), uri, bytes = copied, "uploaded");
    Ok(copied)
}

/// Copies `uri` out of the store into `local`, creating parent directories.
/// Returns the number of bytes copied.
pub fn download_file<S: ChunkStore>(
    fs: &ChunkFs<S>,
    uri: &str,
    local: &Path,
) -> Result<u64, TransferError> {
    let mut src = fs.open(uri, "r")?;
    if let Some(parent) = local.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut dst = File::create(local)?;
    let copied = io::copy(&mut src, &mut dst)?;
    dst.sync_all()?;
    src.close()?;
    tracing::info!(uri, local = %local.display(), bytes = copied, "downloaded");
    Ok(copied)
}

/// Compares the MD5 of `local` with the checksum recorded for `uri`.
/// Returns the matching checksum.
pub fn verify_file<S: ChunkStore>(
    fs: &ChunkFs<S>,
    local: &Path,
    uri: &str,
) -> Result<String, TransferError> {
    let stored = fs
        .stat(uri)?
        .checksum
        .ok_or_else(|| TransferError::MissingChecksum(uri.to_string()))?;
    let local_sum = calculate_file_checksum(local)?;
    if local_sum != stored {
        return Err(TransferError::ChecksumMismatch {
            uri: uri.to_string(),
            local: local_sum,
            stored,
        });
    }
    tracing::debug!(uri, checksum = %stored, "verified");
    Ok(stored)
}
