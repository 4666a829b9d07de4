use chunkfs_store::LocalDirStore;
use chunkfs_stream::{ChunkFs, FsConfig};
use chunkfs_transfer::{
    TransferError, calculate_file_checksum, download_file, local_path_for, upload_file,
    verify_file,
};
use tempfile::TempDir;

fn local_fs(root: &TempDir, chunk_size: u64) -> ChunkFs<LocalDirStore> {
    let store = LocalDirStore::open(root.path().join("store")).unwrap();
    ChunkFs::new(store, FsConfig::default().with_chunk_size(chunk_size)).unwrap()
}

#[test]
fn upload_download_verify_through_local_dir_store() {
    let dir = TempDir::new().unwrap();
    let data: Vec<u8> = (0..5000u32).map(|i| (i % 253) as u8).collect();
    let src = dir.path().join("input.bin");
    std::fs::write(&src, &data).unwrap();

    let fs = local_fs(&dir, 1024);
    assert_eq!(upload_file(&fs, &src, "gridfs://data/input.bin").unwrap(), 5000);
    let checksum = verify_file(&fs, &src, "gridfs://data/input.bin").unwrap();
    assert_eq!(checksum, calculate_file_checksum(&src).unwrap());

    let out = local_path_for(&dir.path().join("out"), "/data/input.bin").unwrap();
    download_file(&fs, "gridfs://data/input.bin", &out).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), data);
}

#[test]
fn store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("note.txt");
    std::fs::write(&src, b"persisted across instances").unwrap();

    upload_file(&local_fs(&dir, 8), &src, "x://note.txt").unwrap();

    // A fresh store over the same directory sees the committed file.
    let fs = local_fs(&dir, 64);
    let stat = fs.stat("x://note.txt").unwrap();
    assert_eq!(stat.size, 26);
    assert_eq!(stat.chunk_size, 8);
    verify_file(&fs, &src, "x://note.txt").unwrap();
}

#[test]
fn verify_fails_after_local_edit() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("a.txt");
    std::fs::write(&src, b"before").unwrap();
    let fs = local_fs(&dir, 4);
    upload_file(&fs, &src, "x://a.txt").unwrap();

    std::fs::write(&src, b"after").unwrap();
    assert!(matches!(
        verify_file(&fs, &src, "x://a.txt"),
        Err(TransferError::ChecksumMismatch { .. })
    ));
}
