//! Local directory store.
//!
//! Layout under the root directory:
//!
//! ```text
//! files/<file_id>.json            FileMetadata as JSON
//! chunks/<file_id>/<index>.chunk  raw chunk payload
//! ```
//!
//! `file_id` is derived from the logical filename (first 16 bytes of its
//! SHA-256, hex encoded), so a lookup by name is a single file read.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::checksum::try_checksum_chunks;
use crate::types::{Chunk, ChunkId, FileId, FileMetadata, MetadataUpdate};
use crate::{ChunkStore, StoreError};

const CHUNK_EXT: &str = "chunk";

/// [`ChunkStore`] persisting to a directory tree.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("files"))?;
        std::fs::create_dir_all(root.join("chunks"))?;
        tracing::debug!(root = %root.display(), "opened local chunk store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic file id for a logical filename.
    pub fn file_id_for(filename: &str) -> FileId {
        let hash = Sha256::digest(filename.as_bytes());
        FileId::new(hex::encode(&hash[..16]))
    }

    fn meta_path(&self, file_id: &FileId) -> PathBuf {
        self.root
            .join("files")
            .join(format!("{}.json", file_id.as_str()))
    }

    fn chunk_dir(&self, file_id: &FileId) -> PathBuf {
        self.root.join("chunks").join(file_id.as_str())
    }

    fn chunk_path(&self, file_id: &FileId, index: u64) -> PathBuf {
        self.chunk_dir(file_id).join(format!("{index}.{CHUNK_EXT}"))
    }

    fn chunk_id(file_id: &FileId, index: u64) -> ChunkId {
        ChunkId::new(format!("{}/{index}", file_id.as_str()))
    }

    fn parse_chunk_id(chunk_id: &ChunkId) -> Result<(FileId, u64), StoreError> {
        let (file, index) = chunk_id
            .as_str()
            .split_once('/')
            .ok_or_else(|| StoreError::NotFound(format!("chunk {chunk_id}")))?;
        let index = index
            .parse::<u64>()
            .map_err(|_| StoreError::NotFound(format!("chunk {chunk_id}")))?;
        Ok((FileId::new(file), index))
    }

    fn read_meta(&self, file_id: &FileId) -> Result<Option<FileMetadata>, StoreError> {
        match std::fs::read_to_string(self.meta_path(file_id)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_meta(&self, meta: &FileMetadata) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(meta)?;
        write_replace(&self.meta_path(&meta.file_id), &json)
    }

    /// Chunk indices present on disk, in ascending order.
    fn chunk_indices(&self, file_id: &FileId) -> Result<Vec<u64>, StoreError> {
        let entries = match std::fs::read_dir(self.chunk_dir(file_id)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_EXT) {
                continue;
            }
            let index = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| {
                    StoreError::Corrupt(format!("unexpected chunk file {}", path.display()))
                })?;
            indices.push(index);
        }
        indices.sort_unstable();
        Ok(indices)
    }
}

/// Writes `data` to a sibling temp file and renames it over `path`.
fn write_replace(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl ChunkStore for LocalDirStore {
    fn find_metadata(&self, filename: &str) -> Result<Option<FileMetadata>, StoreError> {
        let Some(meta) = self.read_meta(&Self::file_id_for(filename))? else {
            return Ok(None);
        };
        if meta.filename != filename {
            return Err(StoreError::Corrupt(format!(
                "metadata for {filename} names {}",
                meta.filename
            )));
        }
        Ok(Some(meta))
    }

    fn create_metadata(
        &self,
        filename: &str,
        chunk_size: u64,
    ) -> Result<FileMetadata, StoreError> {
        let file_id = Self::file_id_for(filename);
        if self.meta_path(&file_id).exists() {
            return Err(StoreError::AlreadyExists(filename.to_string()));
        }
        let meta = FileMetadata {
            file_id,
            filename: filename.to_string(),
            length: 0,
            chunk_size,
            checksum: None,
        };
        // Ids repeat for a reused name; chunks left by an interrupted delete
        // must not show up in the new file.
        self.delete_chunks(&meta.file_id)?;
        self.write_meta(&meta)?;
        tracing::debug!(file = %filename, id = %meta.file_id, "created file record");
        Ok(meta)
    }

    fn update_metadata(&self, file_id: &FileId, update: &MetadataUpdate) -> Result<(), StoreError> {
        let mut meta = self
            .read_meta(file_id)?
            .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))?;
        update.apply(&mut meta);
        self.write_meta(&meta)
    }

    fn delete_metadata(&self, file_id: &FileId) -> Result<(), StoreError> {
        match std::fs::remove_file(self.meta_path(file_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("file {file_id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_chunk(&self, file_id: &FileId, index: u64) -> Result<Option<Chunk>, StoreError> {
        match std::fs::read(self.chunk_path(file_id, index)) {
            Ok(payload) => Ok(Some(Chunk {
                id: Self::chunk_id(file_id, index),
                file_id: file_id.clone(),
                index,
                payload,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn count_chunks(&self, file_id: &FileId) -> Result<u64, StoreError> {
        Ok(self.chunk_indices(file_id)?.len() as u64)
    }

    fn insert_chunk(
        &self,
        file_id: &FileId,
        index: u64,
        payload: &[u8],
    ) -> Result<ChunkId, StoreError> {
        let path = self.chunk_path(file_id, index);
        if path.exists() {
            return Err(StoreError::AlreadyExists(format!(
                "chunk {index} of file {file_id}"
            )));
        }
        write_replace(&path, payload)?;
        Ok(Self::chunk_id(file_id, index))
    }

    fn update_chunk(&self, chunk_id: &ChunkId, payload: &[u8]) -> Result<(), StoreError> {
        let (file_id, index) = Self::parse_chunk_id(chunk_id)?;
        let path = self.chunk_path(&file_id, index);
        if !path.exists() {
            return Err(StoreError::NotFound(format!("chunk {chunk_id}")));
        }
        write_replace(&path, payload)
    }

    fn delete_chunks(&self, file_id: &FileId) -> Result<(), StoreError> {
        match std::fs::remove_dir_all(self.chunk_dir(file_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn compute_checksum(&self, file_id: &FileId) -> Result<String, StoreError> {
        let payloads = self
            .chunk_indices(file_id)?
            .into_iter()
            .map(|index| std::fs::read(self.chunk_path(file_id, index)));
        Ok(try_checksum_chunks(payloads)?)
    }

    fn stored_length(&self, file_id: &FileId) -> Result<u64, StoreError> {
        let mut total = 0u64;
        for index in self.chunk_indices(file_id)? {
            total += std::fs::metadata(self.chunk_path(file_id, index))?.len();
        }
        Ok(total)
    }
}
