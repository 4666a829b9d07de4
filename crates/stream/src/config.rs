use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CHUNK_SIZE, FsError};

/// Settings shared by every handle a [`ChunkFs`](crate::ChunkFs) opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Chunk size given to files created through this filesystem.
    /// Existing files keep the chunk size recorded in their metadata.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Fail `close` when the tracked length disagrees with the bytes the
    /// store actually holds. When false the stored sum is committed and a
    /// warning is logged.
    #[serde(default)]
    pub strict_length_check: bool,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            strict_length_check: false,
        }
    }
}

impl FsConfig {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_length_check = strict;
        self
    }

    pub fn validate(&self) -> Result<(), FsError> {
        if self.chunk_size == 0 {
            return Err(FsError::InvalidConfig("chunk_size must be positive".into()));
        }
        if usize::try_from(self.chunk_size).is_err() {
            return Err(FsError::InvalidConfig(format!(
                "chunk_size {} does not fit in memory",
                self.chunk_size
            )));
        }
        Ok(())
    }
}
