//! Process-local store backed by ordered maps.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::checksum::checksum_chunks;
use crate::types::{Chunk, ChunkId, FileId, FileMetadata, MetadataUpdate};
use crate::{ChunkStore, StoreError};

type ChunkKey = (FileId, u64);

struct StoredChunk {
    id: ChunkId,
    payload: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    files: HashMap<FileId, FileMetadata>,
    by_name: HashMap<String, FileId>,
    chunks: BTreeMap<ChunkKey, StoredChunk>,
    chunk_keys: HashMap<ChunkId, ChunkKey>,
    mutations: u64,
}

impl Inner {
    fn alloc_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn chunks_of(&self, file_id: &FileId) -> impl Iterator<Item = (&ChunkKey, &StoredChunk)> {
        let lo = (file_id.clone(), 0);
        let hi = (file_id.clone(), u64::MAX);
        self.chunks.range(lo..=hi)
    }
}

/// In-memory [`ChunkStore`].
///
/// Keeps a count of every mutating call so tests can assert how much work a
/// handle did against the store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls (create/update/delete/insert) served so far.
    pub fn mutations(&self) -> u64 {
        self.lock().mutations
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    /// Total number of chunk records across all files.
    pub fn chunk_record_count(&self) -> usize {
        self.lock().chunks.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChunkStore for MemoryStore {
    fn find_metadata(&self, filename: &str) -> Result<Option<FileMetadata>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .by_name
            .get(filename)
            .and_then(|id| inner.files.get(id))
            .cloned())
    }

    fn create_metadata(
        &self,
        filename: &str,
        chunk_size: u64,
    ) -> Result<FileMetadata, StoreError> {
        let mut inner = self.lock();
        if inner.by_name.contains_key(filename) {
            return Err(StoreError::AlreadyExists(filename.to_string()));
        }
        let file_id = FileId::new(inner.alloc_id("file-"));
        let meta = FileMetadata {
            file_id: file_id.clone(),
            filename: filename.to_string(),
            length: 0,
            chunk_size,
            checksum: None,
        };
        inner.by_name.insert(filename.to_string(), file_id.clone());
        inner.files.insert(file_id, meta.clone());
        inner.mutations += 1;
        Ok(meta)
    }

    fn update_metadata(&self, file_id: &FileId, update: &MetadataUpdate) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let meta = inner
            .files
            .get_mut(file_id)
            .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))?;
        update.apply(meta);
        inner.mutations += 1;
        Ok(())
    }

    fn delete_metadata(&self, file_id: &FileId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let meta = inner
            .files
            .remove(file_id)
            .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))?;
        inner.by_name.remove(&meta.filename);
        inner.mutations += 1;
        Ok(())
    }

    fn find_chunk(&self, file_id: &FileId, index: u64) -> Result<Option<Chunk>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .chunks
            .get(&(file_id.clone(), index))
            .map(|stored| Chunk {
                id: stored.id.clone(),
                file_id: file_id.clone(),
                index,
                payload: stored.payload.clone(),
            }))
    }

    fn count_chunks(&self, file_id: &FileId) -> Result<u64, StoreError> {
        Ok(self.lock().chunks_of(file_id).count() as u64)
    }

    fn insert_chunk(
        &self,
        file_id: &FileId,
        index: u64,
        payload: &[u8],
    ) -> Result<ChunkId, StoreError> {
        let mut inner = self.lock();
        let key = (file_id.clone(), index);
        if inner.chunks.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!(
                "chunk {index} of file {file_id}"
            )));
        }
        let id = ChunkId::new(inner.alloc_id("chunk-"));
        inner.chunk_keys.insert(id.clone(), key.clone());
        inner.chunks.insert(
            key,
            StoredChunk {
                id: id.clone(),
                payload: payload.to_vec(),
            },
        );
        inner.mutations += 1;
        Ok(id)
    }

    fn update_chunk(&self, chunk_id: &ChunkId, payload: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let key = inner
            .chunk_keys
            .get(chunk_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("chunk {chunk_id}")))?;
        let stored = inner
            .chunks
            .get_mut(&key)
            .ok_or_else(|| StoreError::Corrupt(format!("dangling chunk id {chunk_id}")))?;
        stored.payload = payload.to_vec();
        inner.mutations += 1;
        Ok(())
    }

    fn delete_chunks(&self, file_id: &FileId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let keys: Vec<ChunkKey> = inner.chunks_of(file_id).map(|(k, _)| k.clone()).collect();
        for key in keys {
            if let Some(stored) = inner.chunks.remove(&key) {
                inner.chunk_keys.remove(&stored.id);
            }
        }
        inner.mutations += 1;
        Ok(())
    }

    fn compute_checksum(&self, file_id: &FileId) -> Result<String, StoreError> {
        let inner = self.lock();
        Ok(checksum_chunks(
            inner.chunks_of(file_id).map(|(_, c)| c.payload.as_slice()),
        ))
    }

    fn stored_length(&self, file_id: &FileId) -> Result<u64, StoreError> {
        let inner = self.lock();
        Ok(inner
            .chunks_of(file_id)
            .map(|(_, c)| c.payload.len() as u64)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum_bytes;

    #[test]
    fn create_then_find() {
        let store = MemoryStore::new();
        let meta = store.create_metadata("/a.bin", 4).unwrap();
        assert_eq!(meta.length, 0);
        assert_eq!(meta.chunk_size, 4);

        let found = store.find_metadata("/a.bin").unwrap().unwrap();
        assert_eq!(found, meta);
        assert!(store.find_metadata("/b.bin").unwrap().is_none());
    }

    #[test]
    fn create_twice_fails() {
        let store = MemoryStore::new();
        store.create_metadata("/a.bin", 4).unwrap();
        let err = store.create_metadata("/a.bin", 4).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn chunks_are_scoped_per_file() {
        let store = MemoryStore::new();
        let a = store.create_metadata("/a", 4).unwrap().file_id;
        let b = store.create_metadata("/b", 4).unwrap().file_id;
        store.insert_chunk(&a, 0, b"AAAA").unwrap();
        store.insert_chunk(&a, 1, b"AA").unwrap();
        store.insert_chunk(&b, 0, b"BBBB").unwrap();

        assert_eq!(store.count_chunks(&a).unwrap(), 2);
        assert_eq!(store.count_chunks(&b).unwrap(), 1);
        assert_eq!(store.stored_length(&a).unwrap(), 6);

        store.delete_chunks(&a).unwrap();
        assert_eq!(store.count_chunks(&a).unwrap(), 0);
        assert_eq!(store.count_chunks(&b).unwrap(), 1);
    }

    #[test]
    fn duplicate_chunk_index_rejected() {
        let store = MemoryStore::new();
        let id = store.create_metadata("/a", 4).unwrap().file_id;
        store.insert_chunk(&id, 0, b"x").unwrap();
        assert!(matches!(
            store.insert_chunk(&id, 0, b"y"),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn update_chunk_replaces_payload() {
        let store = MemoryStore::new();
        let file = store.create_metadata("/a", 4).unwrap().file_id;
        let chunk = store.insert_chunk(&file, 0, b"abcd").unwrap();
        store.update_chunk(&chunk, b"xy").unwrap();
        let found = store.find_chunk(&file, 0).unwrap().unwrap();
        assert_eq!(found.payload, b"xy");
        assert_eq!(found.id, chunk);

        let missing = ChunkId::new("nope");
        assert!(matches!(
            store.update_chunk(&missing, b"z"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn checksum_follows_index_order() {
        let store = MemoryStore::new();
        let file = store.create_metadata("/a", 4).unwrap().file_id;
        // Insert out of order: the digest must still follow chunk indices.
        store.insert_chunk(&file, 2, b"LD").unwrap();
        store.insert_chunk(&file, 0, b"HELL").unwrap();
        store.insert_chunk(&file, 1, b"OWOR").unwrap();
        assert_eq!(
            store.compute_checksum(&file).unwrap(),
            checksum_bytes(b"HELLOWORLD")
        );
    }

    #[test]
    fn delete_metadata_frees_name() {
        let store = MemoryStore::new();
        let meta = store.create_metadata("/a", 4).unwrap();
        store.delete_metadata(&meta.file_id).unwrap();
        assert!(store.find_metadata("/a").unwrap().is_none());
        assert_eq!(store.file_count(), 0);
        store.create_metadata("/a", 8).unwrap();
    }

    #[test]
    fn mutations_counted() {
        let store = MemoryStore::new();
        assert_eq!(store.mutations(), 0);
        let meta = store.create_metadata("/a", 4).unwrap();
        store.insert_chunk(&meta.file_id, 0, b"x").unwrap();
        store.find_chunk(&meta.file_id, 0).unwrap();
        assert_eq!(store.mutations(), 2);
    }
}
