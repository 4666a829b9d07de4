//! Random-access byte streams over a chunk store.
//!
//! A [`ChunkFs`] owns a [`ChunkStore`] and an [`FsConfig`] and hands out
//! [`FileHandle`]s. Each handle keeps exactly one chunk of its file in
//! memory, translates byte offsets into `(chunk index, offset in chunk)`,
//! flushes the buffered chunk before moving to another one, and on close
//! commits the file's final length and checksum to its metadata record.
//!
//! ```no_run
//! use chunkfs_store::MemoryStore;
//! use chunkfs_stream::{ChunkFs, FsConfig};
//!
//! let fs = ChunkFs::new(MemoryStore::new(), FsConfig::default())?;
//! let mut file = fs.open("gridfs://hello.txt", "w")?;
//! file.write(b"hello world")?;
//! file.close()?;
//!
//! let mut file = fs.open("gridfs://hello.txt", "r")?;
//! assert_eq!(file.read(5)?, b"hello");
//! # Ok::<(), chunkfs_stream::FsError>(())
//! ```
//!
//! Handles share nothing with each other. Two handles open on the same file
//! each buffer their own copy of a chunk, and whichever flushes last wins.

mod cache;
mod config;
mod error;
mod fs;
mod handle;
mod io;
mod mode;
mod uri;

pub use chunkfs_store::ChunkStore;
pub use config::FsConfig;
pub use error::FsError;
pub use fs::ChunkFs;
pub use handle::{FileHandle, FileStat};
pub use mode::{ModeParseError, OpenMode};
pub use uri::logical_filename;

/// Default chunk size for newly created files: 256 KiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 256 * 1024;
