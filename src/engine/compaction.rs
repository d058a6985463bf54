//! FLATAR - Compaction
//! Rewrites an archive into a side file and atomically swaps it in.
//!
//! ## Algorithm
//! 1. Open the archive for reading (a missing archive reads as empty)
//! 2. Create a unique temporary file next to it
//! 3. Copy every entry verbatim, omitting live entries named `drop_name`
//! 4. Append the `insert` entry, if any
//! 5. Flush, fsync, rename over the archive path
//!
//! Any failure drops the temporary file, leaving the archive untouched.
//! Both "add" and "extract" are expressed as one compaction.

use std::ffi::OsString;
use std::fs::{File, Permissions};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::config::Config;
use crate::error::{ArchiveError, IoError, Result};
use crate::types::{validate_name, EntryMeta};

use super::header::{encode_header, EntryHeader, HEADER_SIZE};
use super::scanner::Scanner;
use super::stream::{copy_exact, write_exact, ArchiveSource};

/// Mode for an archive created by its first compaction.
const NEW_ARCHIVE_MODE: u32 = 0o644;

/// An entry to append at the end of a compaction.
pub struct Insert<'a> {
    pub name: &'a [u8],
    pub meta: EntryMeta,
    /// Exactly this many bytes are read from `source`.
    pub content_len: u64,
    pub source: &'a mut dyn Read,
}

/// What a compaction did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    /// Entries copied from the old archive.
    pub kept: usize,
    /// Entries omitted because they matched `drop_name`.
    pub dropped: usize,
    pub inserted: bool,
    /// Size of the committed archive in bytes.
    pub bytes_written: u64,
}

/// Rewrite the archive at `config.archive_path`, dropping every live entry
/// named `drop_name` and appending `insert`.
pub fn compact(
    config: &Config,
    drop_name: Option<&[u8]>,
    insert: Option<Insert<'_>>,
) -> Result<CompactionReport> {
    let path = config.archive_path.as_path();
    let file_name = path
        .file_name()
        .ok_or_else(|| ArchiveError::Config(format!("archive path {:?} has no file name", path)))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if let Some(insert) = &insert {
        validate_name(insert.name, config.max_name_len)?;
    }

    let source = match File::open(path) {
        Ok(file) => Some(file),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(IoError::transport("open archive", e).into()),
    };
    let mode = match &source {
        Some(file) => file
            .metadata()
            .map_err(|e| IoError::transport("stat archive", e))?
            .permissions()
            .mode(),
        None => NEW_ARCHIVE_MODE,
    };
    let permissions = Permissions::from_mode(mode & 0o7777);

    let mut prefix = OsString::from(".");
    prefix.push(file_name);
    prefix.push(".tmp.");
    let tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .permissions(permissions)
        .tempfile_in(dir)
        .map_err(|e| IoError::transport("create temp file", e))?;

    let mut report = CompactionReport::default();
    {
        let mut out = BufWriter::with_capacity(config.buffer_size, tmp.as_file());

        if let Some(file) = source {
            let src = ArchiveSource::probe(file, config.buffer_size)?;
            let mut scanner = Scanner::new(src, config.buffer_size, config.max_name_len);
            while let Some(entry) = scanner.next_entry()? {
                if !entry.is_tombstone() && drop_name == Some(entry.name.as_slice()) {
                    scanner.skip_content()?;
                    report.dropped += 1;
                    continue;
                }
                write_exact(&mut out, &encode_header(&entry.header))?;
                write_exact(&mut out, &entry.name)?;
                let copied = scanner.copy_content(&mut out)?;
                report.kept += 1;
                report.bytes_written += (HEADER_SIZE + entry.name.len()) as u64 + copied;
            }
        }

        if let Some(insert) = insert {
            let header = EntryHeader::new(insert.name.len() as u32, insert.content_len, insert.meta);
            write_exact(&mut out, &encode_header(&header))?;
            write_exact(&mut out, insert.name)?;
            let mut scratch = vec![0u8; config.buffer_size];
            copy_exact(insert.source, &mut out, insert.content_len, &mut scratch)?;
            report.inserted = true;
            report.bytes_written += (HEADER_SIZE + insert.name.len()) as u64 + insert.content_len;
        }

        out.flush()
            .map_err(|e| IoError::transport("write temp file", e))?;
    }

    if config.sync_writes {
        tmp.as_file()
            .sync_all()
            .map_err(|e| IoError::transport("fsync temp file", e))?;
    }

    tmp.persist(path)
        .map_err(|e| IoError::transport("rename", e.error))?;

    if config.sync_writes {
        if let Err(e) = sync_dir(dir) {
            log::warn!("fsync of directory {:?} failed: {}", dir, e);
        }
    }

    log::debug!(
        "Compacted {:?}: kept {}, dropped {}, inserted {}, {} bytes",
        path,
        report.kept,
        report.dropped,
        report.inserted,
        report.bytes_written
    );

    Ok(report)
}

/// Flush a directory entry so a completed rename survives a crash.
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
