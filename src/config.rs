//! FLATAR - Engine Configuration
//! Defines tunable parameters for archive operations.

use std::path::PathBuf;

use crate::error::{ArchiveError, Result};

/// Hard upper bound for a stored entry name, in bytes.
pub const MAX_NAME_LEN: u32 = 1 << 20;

/// Default size of the bounded copy buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for one archive.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the archive file.
    pub archive_path: PathBuf,

    /// Chunk size used when copying or discarding entry content.
    pub buffer_size: usize,

    /// Whether to fsync the rewritten archive before committing it.
    pub sync_writes: bool,

    /// Directory that extracted files are written into.
    pub extract_dir: PathBuf,

    /// Largest name length accepted from an archive or a caller.
    pub max_name_len: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_path: PathBuf::from("archive.far"),
            buffer_size: DEFAULT_BUFFER_SIZE,
            sync_writes: true,
            extract_dir: PathBuf::from("."),
            max_name_len: MAX_NAME_LEN,
        }
    }
}

impl Config {
    /// Create a new Config for the given archive path.
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            ..Default::default()
        }
    }

    /// Set the copy buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Enable or disable fsync of the rewritten archive.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Set the directory extracted files land in.
    pub fn with_extract_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extract_dir = dir.into();
        self
    }

    /// Lower the accepted name length.
    pub fn with_max_name_len(mut self, len: u32) -> Self {
        self.max_name_len = len;
        self
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(ArchiveError::Config("buffer size must be non-zero".into()));
        }
        if self.max_name_len == 0 || self.max_name_len > MAX_NAME_LEN {
            return Err(ArchiveError::Config(format!(
                "max name length must be within 1..={}",
                MAX_NAME_LEN
            )));
        }
        if self.archive_path.as_os_str().is_empty() {
            return Err(ArchiveError::Config("archive path is empty".into()));
        }
        Ok(())
    }
}
