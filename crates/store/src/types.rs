use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a file record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a single chunk record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-file metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: FileId,
    pub filename: String,
    /// Total length in bytes. Authoritative only after a successful close.
    pub length: u64,
    /// Maximum payload size of every chunk of this file. Never changes.
    pub chunk_size: u64,
    /// MD5 hex digest, set by the last successful close.
    #[serde(default)]
    pub checksum: Option<String>,
}

/// A stored chunk of file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub file_id: FileId,
    pub index: u64,
    pub payload: Vec<u8>,
}

/// Fields to change in a [`FileMetadata`] record. Unset fields are left as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub length: Option<u64>,
    /// `Some(None)` clears the checksum.
    pub checksum: Option<Option<String>>,
}

impl MetadataUpdate {
    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(Some(checksum.into()));
        self
    }

    pub fn clear_checksum(mut self) -> Self {
        self.checksum = Some(None);
        self
    }

    /// Writes the set fields into `meta`.
    pub fn apply(&self, meta: &mut FileMetadata) {
        if let Some(length) = self.length {
            meta.length = length;
        }
        if let Some(checksum) = &self.checksum {
            meta.checksum = checksum.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileMetadata {
        FileMetadata {
            file_id: FileId::new("f1"),
            filename: "/a.bin".into(),
            length: 10,
            chunk_size: 4,
            checksum: Some("abc".into()),
        }
    }

    #[test]
    fn update_leaves_unset_fields() {
        let mut meta = sample();
        MetadataUpdate::default().length(3).apply(&mut meta);
        assert_eq!(meta.length, 3);
        assert_eq!(meta.checksum.as_deref(), Some("abc"));
    }

    #[test]
    fn update_clears_checksum() {
        let mut meta = sample();
        MetadataUpdate::default()
            .length(0)
            .clear_checksum()
            .apply(&mut meta);
        assert_eq!(meta.length, 0);
        assert!(meta.checksum.is_none());
    }

    #[test]
    fn metadata_json_without_checksum() {
        let json = r#"{"file_id":"x","filename":"/x","length":0,"chunk_size":8}"#;
        let meta: FileMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.file_id.as_str(), "x");
        assert!(meta.checksum.is_none());
    }
}
