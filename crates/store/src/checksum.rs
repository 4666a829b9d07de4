use md5::{Digest, Md5};

/// Computes MD5 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes MD5 over the concatenation of `chunks`, in iteration order.
///
/// Equal to [`checksum_bytes`] of the joined payloads, so a file's checksum
/// does not depend on how it was split into chunks.
pub fn checksum_chunks<I, B>(chunks: I) -> String
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut hasher = Md5::new();
    for chunk in chunks {
        hasher.update(chunk.as_ref());
    }
    hex::encode(hasher.finalize())
}

/// Like [`checksum_chunks`] for payloads that are loaded one at a time.
/// Stops at the first error.
pub fn try_checksum_chunks<I, B, E>(chunks: I) -> Result<String, E>
where
    I: IntoIterator<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut hasher = Md5::new();
    for chunk in chunks {
        hasher.update(chunk?.as_ref());
    }
    Ok(hex::encode(hasher.finalize()))
}
