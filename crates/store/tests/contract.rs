//! Behaviour every `ChunkStore` backend must share.

use std::sync::Arc;

use chunkfs_store::{
    ChunkStore, LocalDirStore, MemoryStore, MetadataUpdate, StoreError, checksum_bytes,
};
use tempfile::TempDir;

fn metadata_lifecycle(store: &dyn ChunkStore) {
    assert!(store.find_metadata("/doc.txt").unwrap().is_none());
    let meta = store.create_metadata("/doc.txt", 8).unwrap();
    assert_eq!(meta.filename, "/doc.txt");
    assert_eq!(meta.length, 0);
    assert_eq!(meta.checksum, None);
    assert!(matches!(
        store.create_metadata("/doc.txt", 8),
        Err(StoreError::AlreadyExists(_))
    ));

    let update = MetadataUpdate::default().length(42).checksum("abc");
    store.update_metadata(&meta.file_id, &update).unwrap();
    let found = store.find_metadata("/doc.txt").unwrap().unwrap();
    assert_eq!(found.length, 42);
    assert_eq!(found.checksum.as_deref(), Some("abc"));

    let clear = MetadataUpdate::default().clear_checksum();
    store.update_metadata(&meta.file_id, &clear).unwrap();
    let found = store.find_metadata("/doc.txt").unwrap().unwrap();
    assert_eq!(found.length, 42);
    assert_eq!(found.checksum, None);

    store.delete_metadata(&meta.file_id).unwrap();
    assert!(store.find_metadata("/doc.txt").unwrap().is_none());
    assert!(matches!(
        store.update_metadata(&meta.file_id, &update),
        Err(StoreError::NotFound(_))
    ));
}

fn chunk_lifecycle(store: &dyn ChunkStore) {
    let file = store.create_metadata("/video.flv", 4).unwrap().file_id;
    assert_eq!(store.count_chunks(&file).unwrap(), 0);
    assert_eq!(store.stored_length(&file).unwrap(), 0);
    assert_eq!(store.compute_checksum(&file).unwrap(), checksum_bytes(b""));

    let second = store.insert_chunk(&file, 1, b"OWOR").unwrap();
    store.insert_chunk(&file, 0, b"HELL").unwrap();
    store.insert_chunk(&file, 2, b"LD").unwrap();
    assert!(matches!(
        store.insert_chunk(&file, 2, b"??"),
        Err(StoreError::AlreadyExists(_))
    ));
    assert_eq!(store.count_chunks(&file).unwrap(), 3);
    assert_eq!(store.stored_length(&file).unwrap(), 10);
    assert_eq!(
        store.compute_checksum(&file).unwrap(),
        checksum_bytes(b"HELLOWORLD")
    );

    store.update_chunk(&second, b"0W0R").unwrap();
    let chunk = store.find_chunk(&file, 1).unwrap().unwrap();
    assert_eq!(chunk.index, 1);
    assert_eq!(chunk.file_id, file);
    assert_eq!(chunk.payload, b"0W0R");

    store.delete_chunks(&file).unwrap();
    assert_eq!(store.count_chunks(&file).unwrap(), 0);
    assert!(store.find_chunk(&file, 0).unwrap().is_none());
    assert!(matches!(
        store.update_chunk(&second, b"x"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn memory_store_contract() {
    metadata_lifecycle(&MemoryStore::new());
    chunk_lifecycle(&MemoryStore::new());
}

#[test]
fn local_dir_store_contract() {
    let tmp = TempDir::new().unwrap();
    metadata_lifecycle(&LocalDirStore::open(tmp.path().join("a")).unwrap());
    chunk_lifecycle(&LocalDirStore::open(tmp.path().join("b")).unwrap());
}

#[test]
fn shared_store_through_arc() {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<MemoryStore> = Arc::clone(&store);
    chunk_lifecycle(&shared);
    assert_eq!(store.file_count(), 1);
}
