use std::io::{self, Read, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chunkfs_store::LocalDirStore;
use chunkfs_stream::{ChunkFs, logical_filename};
use chunkfs_transfer::{download_file, local_path_for, upload_file, verify_file};

use crate::config::Config;

pub type LocalFs = ChunkFs<LocalDirStore>;

const DEFAULT_SCHEME: &str = "chunkfs://";

pub fn open_fs(config: &Config) -> anyhow::Result<LocalFs> {
    let store = LocalDirStore::open(&config.store_root).with_context(|| {
        format!("failed to open store at {}", config.store_root.display())
    })?;
    Ok(ChunkFs::new(store, config.fs.clone())?)
}

/// Accepts bare paths on the command line by adding the default scheme.
fn to_uri(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{}", target.trim_start_matches('/'))
    }
}

pub fn put(fs: &LocalFs, local: &Path, target: &str) -> anyhow::Result<()> {
    let uri = to_uri(target);
    let bytes = upload_file(fs, local, &uri)
        .with_context(|| format!("failed to upload {}", local.display()))?;
    println!("{uri}: {bytes} bytes");
    Ok(())
}

pub fn get(fs: &LocalFs, target: &str, local: Option<PathBuf>) -> anyhow::Result<()> {
    let uri = to_uri(target);
    let local = match local {
        Some(path) => path,
        None => local_path_for(&std::env::current_dir()?, &logical_filename(&uri)?)?,
    };
    let bytes = download_file(fs, &uri, &local)
        .with_context(|| format!("failed to download {uri}"))?;
    println!("{}: {bytes} bytes", local.display());
    Ok(())
}

pub fn cat(fs: &LocalFs, target: &str, offset: u64, length: Option<u64>) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    copy_range(fs, target, offset, length, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Copies `length` bytes (or the rest of the file) starting at `offset`.
fn copy_range<W: Write>(
    fs: &LocalFs,
    target: &str,
    offset: u64,
    length: Option<u64>,
    out: &mut W,
) -> anyhow::Result<u64> {
    let uri = to_uri(target);
    let mut file = fs.open(&uri, "r")?;
    file.seek(SeekFrom::Start(offset))?;
    let copied = match length {
        Some(length) => io::copy(&mut (&mut file).take(length), out)?,
        None => io::copy(&mut file, out)?,
    };
    file.close()?;
    Ok(copied)
}

pub fn stat(fs: &LocalFs, target: &str) -> anyhow::Result<()> {
    let stat = fs.stat(&to_uri(target))?;
    println!("{}", serde_json::to_string_pretty(&stat)?);
    Ok(())
}

pub fn rm(fs: &LocalFs, target: &str) -> anyhow::Result<()> {
    let uri = to_uri(target);
    fs.delete(&uri)?;
    println!("removed {uri}");
    Ok(())
}

pub fn verify(fs: &LocalFs, local: &Path, target: &str) -> anyhow::Result<()> {
    let uri = to_uri(target);
    let checksum = verify_file(fs, local, &uri)?;
    println!("{uri}: OK ({checksum})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chunkfs_stream::FsConfig;

    use super::*;

    fn test_fs(dir: &Path) -> LocalFs {
        let config = Config {
            store_root: dir.join("store"),
            log_filter: "off".into(),
            fs: FsConfig::default().with_chunk_size(8),
        };
        open_fs(&config).unwrap()
    }

    #[test]
    fn bare_paths_get_default_scheme() {
        assert_eq!(to_uri("a/b.txt"), "chunkfs://a/b.txt");
        assert_eq!(to_uri("/a/b.txt"), "chunkfs://a/b.txt");
        assert_eq!(to_uri("gridfs://x"), "gridfs://x");
    }

    #[test]
    fn put_stat_verify_rm() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = test_fs(tmp.path());
        let local = tmp.path().join("in.txt");
        std::fs::write(&local, b"hello chunks").unwrap();

        put(&fs, &local, "docs/in.txt").unwrap();
        assert_eq!(fs.stat("chunkfs://docs/in.txt").unwrap().size, 12);
        verify(&fs, &local, "docs/in.txt").unwrap();
        stat(&fs, "docs/in.txt").unwrap();

        let out = tmp.path().join("out.txt");
        get(&fs, "docs/in.txt", Some(out.clone())).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"hello chunks");

        rm(&fs, "docs/in.txt").unwrap();
        assert!(!fs.exists("chunkfs://docs/in.txt").unwrap());
        assert!(rm(&fs, "docs/in.txt").is_err());
    }

    #[test]
    fn cat_honours_offset_and_length() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = test_fs(tmp.path());
        let local = tmp.path().join("alpha.txt");
        std::fs::write(&local, b"abcdefghijklmnopqrst").unwrap();
        put(&fs, &local, "alpha.txt").unwrap();

        let mut out = Vec::new();
        assert_eq!(copy_range(&fs, "alpha.txt", 6, Some(5), &mut out).unwrap(), 5);
        assert_eq!(out, b"ghijk");

        out.clear();
        assert_eq!(copy_range(&fs, "alpha.txt", 15, None, &mut out).unwrap(), 5);
        assert_eq!(out, b"pqrst");

        out.clear();
        assert_eq!(copy_range(&fs, "alpha.txt", 18, Some(10), &mut out).unwrap(), 2);
        assert_eq!(out, b"st");

        assert!(copy_range(&fs, "alpha.txt", 21, None, &mut out).is_err());
    }
}
