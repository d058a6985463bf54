//! FLATAR - Custom Error Types
//! Defines the error hierarchy for the archive engine.

use std::path::PathBuf;

use thiserror::Error;

/// Custom Result type for the flatar engine.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Failures of the byte-exact I/O layer.
#[derive(Error, Debug)]
pub enum IoError {
    /// Device, permission or filesystem failure, tagged with the failing step.
    #[error("{op} failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// End of input reached before a length field was satisfied.
    #[error("unexpected end of input: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },
}

impl IoError {
    /// Wrap an `std::io::Error` with the name of the step that produced it.
    pub fn transport(op: &'static str, source: std::io::Error) -> Self {
        IoError::Transport { op, source }
    }
}

/// Failures of the on-disk format.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Fewer bytes than a full header were handed to the decoder.
    #[error("truncated header: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Header fields fail sanity checks.
    #[error("corrupt archive: {0}")]
    Corrupt(String),
}

/// Error types for archive operations.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// Extraction target absent from the archive.
    #[error("not found in archive: {0}")]
    NotFound(String),

    /// Entry name that cannot be stored or extracted.
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Source path is not a regular file.
    #[error("not a regular file: {0}")]
    InvalidSource(PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ArchiveError {
    /// Returns true for errors caused by a damaged archive file.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ArchiveError::Format(_) | ArchiveError::Io(IoError::Truncated { .. })
        )
    }
}
