//! FLATAR - Archive Engine Module
//! Top-level module tying the codec, scanner and compaction together.

pub mod compaction;
pub mod header;
pub mod scanner;
pub mod stream;

use std::ffi::OsStr;
use std::fs::{self, File, FileTimes, OpenOptions, Permissions};
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{fchown, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::error::{ArchiveError, IoError, Result};
use crate::types::{validate_name, EntryInfo, EntryMeta};

use self::compaction::{compact, CompactionReport, Insert};
use self::scanner::Scanner;
use self::stream::ArchiveSource;

/// Mode of an extracted file until its stored attributes are applied.
const EXTRACT_CREATE_MODE: u32 = 0o600;

/// Outcome of a successful extraction.
#[derive(Debug, Clone)]
pub struct ExtractReport {
    /// Where the content was written.
    pub path: PathBuf,
    pub content_len: u64,
    /// Attributes that could not be restored.
    pub warnings: Vec<String>,
    pub compaction: CompactionReport,
}

/// A flat-file archive.
///
/// Holds no cached state: every operation reopens and rescans the file, and
/// every mutation is committed by a single atomic rename. Readers therefore
/// always see a complete archive. Two writers racing on the same path are
/// not coordinated; the last rename wins and callers must serialize them.
pub struct Archive {
    config: Config,
}

impl Archive {
    /// Bind to the archive described by `config`. The file itself is only
    /// created by the first `add`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.config.archive_path
    }

    /// Open a scanner, or `None` when the archive does not exist yet.
    fn scanner(&self) -> Result<Option<Scanner<ArchiveSource>>> {
        let file = match File::open(self.path()) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IoError::transport("open archive", e).into()),
        };
        let src = ArchiveSource::probe(file, self.config.buffer_size)?;
        Ok(Some(Scanner::new(
            src,
            self.config.buffer_size,
            self.config.max_name_len,
        )))
    }

    /// Stream every live entry to `f` without reading any content.
    /// Returns the number of entries visited.
    pub fn for_each_entry<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(&EntryInfo),
    {
        let Some(mut scanner) = self.scanner()? else {
            return Ok(0);
        };

        let mut count = 0;
        while let Some(entry) = scanner.next_entry()? {
            scanner.skip_content()?;
            if entry.is_tombstone() {
                continue;
            }
            f(&entry.info());
            count += 1;
        }
        Ok(count)
    }

    /// Collect the listing of all live entries.
    pub fn list(&self) -> Result<Vec<EntryInfo>> {
        let mut entries = Vec::new();
        self.for_each_entry(|info| entries.push(info.clone()))?;
        Ok(entries)
    }

    /// Store `source` under its final path component, replacing any entry
    /// with the same name.
    pub fn add(&self, source: impl AsRef<Path>) -> Result<CompactionReport> {
        let source = source.as_ref();
        let name = source
            .file_name()
            .ok_or_else(|| ArchiveError::InvalidName {
                name: source.display().to_string(),
                reason: "path has no final component",
            })?
            .as_bytes();
        validate_name(name, self.config.max_name_len)?;

        let mut file = File::open(source).map_err(|e| IoError::transport("open source", e))?;
        let meta = file
            .metadata()
            .map_err(|e| IoError::transport("stat source", e))?;
        if !meta.is_file() {
            return Err(ArchiveError::InvalidSource(source.to_path_buf()));
        }

        let report = compact(
            &self.config,
            Some(name),
            Some(Insert {
                name,
                meta: EntryMeta::from_metadata(&meta),
                content_len: meta.len(),
                source: &mut file,
            }),
        )?;

        log::info!(
            "Added {:?} to {:?} ({} bytes, {} replaced)",
            source,
            self.path(),
            meta.len(),
            report.dropped
        );
        Ok(report)
    }

    /// Move the entry `name` out of the archive into `extract_dir`.
    pub fn extract(&self, name: &[u8]) -> Result<ExtractReport> {
        validate_name(name, self.config.max_name_len)?;
        let not_found = || ArchiveError::NotFound(String::from_utf8_lossy(name).into_owned());

        let mut scanner = self.scanner()?.ok_or_else(not_found)?;
        let entry = loop {
            match scanner.next_entry()? {
                Some(entry) if !entry.is_tombstone() && entry.name == name => break entry,
                Some(_) => continue,
                None => return Err(not_found()),
            }
        };

        let out_path = self.config.extract_dir.join(OsStr::from_bytes(name));
        if let Ok(existing) = fs::metadata(&out_path) {
            let archive = scanner.source().metadata()?;
            if existing.dev() == archive.dev() && existing.ino() == archive.ino() {
                return Err(ArchiveError::InvalidName {
                    name: String::from_utf8_lossy(name).into_owned(),
                    reason: "would overwrite the archive",
                });
            }
        }
        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(EXTRACT_CREATE_MODE)
            .open(&out_path)
            .map_err(|e| IoError::transport("create output file", e))?;

        let written = scanner.copy_content(&mut out).and_then(|n| {
            if self.config.sync_writes {
                out.sync_all()
                    .map_err(|e| IoError::transport("fsync output file", e))?;
            }
            Ok(n)
        });
        let content_len = match written {
            Ok(n) => n,
            Err(e) => {
                drop(out);
                let _ = fs::remove_file(&out_path);
                return Err(e.into());
            }
        };

        let warnings = restore_attributes(&out, &out_path, &entry.header.meta());
        drop(out);
        drop(scanner);

        let compaction = compact(&self.config, Some(name), None)?;
        log::info!(
            "Extracted {:?} from {:?} ({} bytes)",
            out_path,
            self.path(),
            content_len
        );

        Ok(ExtractReport {
            path: out_path,
            content_len,
            warnings,
            compaction,
        })
    }
}

/// Convert stored epoch seconds into a `SystemTime`.
fn epoch_time(secs: i64) -> Option<SystemTime> {
    let offset = Duration::from_secs(secs.unsigned_abs());
    if secs >= 0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    }
}

/// Apply mode, ownership and times to an extracted file. Failures are
/// logged and returned rather than propagated.
fn restore_attributes(file: &File, path: &Path, meta: &EntryMeta) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut warn = |msg: String| {
        log::warn!("{}", msg);
        warnings.push(msg);
    };

    if let Err(e) = file.set_permissions(Permissions::from_mode(meta.permissions())) {
        warn(format!("chmod {:?} to {:o}: {}", path, meta.permissions(), e));
    }
    if let Err(e) = fchown(file, Some(meta.uid), Some(meta.gid)) {
        warn(format!("chown {:?} to {}:{}: {}", path, meta.uid, meta.gid, e));
    }
    match epoch_time(meta.mtime) {
        Some(t) => {
            let times = FileTimes::new().set_accessed(t).set_modified(t);
            if let Err(e) = file.set_times(times) {
                warn(format!("set times on {:?}: {}", path, e));
            }
        }
        None => warn(format!("mtime {} of {:?} is out of range", meta.mtime, path)),
    }

    warnings
}
