//! FLATAR - Core Type Definitions
//! Defines the entry-level types shared across the engine.

use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;

use serde::{Serialize, Serializer};

use crate::error::{ArchiveError, Result};

/// Entry name type.
/// Names are raw bytes; they are only interpreted as a path on extraction.
pub type Name = Vec<u8>;

/// POSIX metadata snapshotted when an entry is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryMeta {
    /// Full `st_mode`, file-type bits included.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Modification time in epoch seconds.
    pub mtime: i64,
}

impl EntryMeta {
    /// Capture metadata from an `fstat` result.
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            mtime: meta.mtime(),
        }
    }

    /// Permission bits only (setuid/setgid/sticky included).
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// One row of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    #[serde(serialize_with = "lossy_name")]
    pub name: Name,
    pub content_len: u64,
    #[serde(flatten)]
    pub meta: EntryMeta,
}

impl EntryInfo {
    /// Name rendered for humans; invalid UTF-8 is replaced.
    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

fn lossy_name<S: Serializer>(name: &Name, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(name))
}

/// Check that `name` can be stored as, or extracted to, a single file name.
pub fn validate_name(name: &[u8], max_len: u32) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.len() > max_len as usize {
        Some("name is too long")
    } else if name == b"." || name == b".." {
        Some("name is a directory reference")
    } else if name.contains(&b'/') {
        Some("name contains a path separator")
    } else if name.contains(&0) {
        Some("name contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ArchiveError::InvalidName {
            name: String::from_utf8_lossy(name).into_owned(),
            reason,
        }),
        None => Ok(()),
    }
}
