//! `std::io` adapters, so handles work with `io::copy`, `BufReader` and the like.

use std::io::{self, Read, Seek, SeekFrom, Write};

use chunkfs_store::ChunkStore;

use crate::FileHandle;

impl<S: ChunkStore> Read for FileHandle<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl<S: ChunkStore> Write for FileHandle<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(FileHandle::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(FileHandle::flush(self)?)
    }
}

impl<S: ChunkStore> Seek for FileHandle<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(FileHandle::seek(self, pos)?)
    }
}
