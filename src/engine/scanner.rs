//! FLATAR - Archive Scanner
//! Forward-only iteration over the entries of an archive stream.
//!
//! The scanner decodes one header and name at a time and leaves the content
//! in the stream. The caller may copy it, read it, or skip it; anything left
//! behind is skipped before the next header is decoded.

use std::io::{self, ErrorKind, Read, Write};

use crate::error::{FormatError, IoError, Result};
use crate::types::{EntryInfo, Name};

use super::header::{decode_header, EntryHeader, HEADER_SIZE};
use super::stream::{copy_exact, read_exact, read_full, SkipRead};

/// Header and name of the entry the scanner is positioned on.
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub header: EntryHeader,
    pub name: Name,
}

impl ScannedEntry {
    /// Listing row for this entry.
    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            name: self.name.clone(),
            content_len: self.header.content_len,
            meta: self.header.meta(),
        }
    }

    /// True when the reserved tombstone flag is set.
    pub fn is_tombstone(&self) -> bool {
        self.header.deleted
    }
}

/// Sequential reader over an archive.
pub struct Scanner<S> {
    src: S,
    max_name_len: u32,
    /// Content bytes of the current entry not yet consumed.
    pending: u64,
    scratch: Vec<u8>,
}

impl<S: SkipRead> Scanner<S> {
    pub fn new(src: S, buffer_size: usize, max_name_len: u32) -> Self {
        Self {
            src,
            max_name_len,
            pending: 0,
            scratch: vec![0u8; buffer_size.max(1)],
        }
    }

    /// Advance to the next entry. `Ok(None)` marks a clean end of archive.
    pub fn next_entry(&mut self) -> Result<Option<ScannedEntry>> {
        self.skip_content()?;

        let mut raw = [0u8; HEADER_SIZE];
        let got = read_full(&mut self.src, &mut raw)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_SIZE {
            return Err(FormatError::Corrupt(format!(
                "partial header: {} of {} bytes",
                got, HEADER_SIZE
            ))
            .into());
        }

        let header = decode_header(&raw)?;
        if header.name_len == 0 || header.name_len > self.max_name_len {
            return Err(FormatError::Corrupt(format!(
                "name length {} outside 1..={}",
                header.name_len, self.max_name_len
            ))
            .into());
        }

        let name = read_exact(&mut self.src, header.name_len as usize)?;
        self.pending = header.content_len;
        Ok(Some(ScannedEntry { header, name }))
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.src
    }

    /// Skip whatever is left of the current entry's content.
    pub fn skip_content(&mut self) -> std::result::Result<(), IoError> {
        let n = std::mem::take(&mut self.pending);
        self.src.skip(n, &mut self.scratch)
    }

    /// Copy the rest of the current entry's content into `sink`.
    /// Returns the number of bytes copied.
    pub fn copy_content<W: Write + ?Sized>(&mut self, sink: &mut W) -> std::result::Result<u64, IoError> {
        let n = std::mem::take(&mut self.pending);
        copy_exact(&mut self.src, sink, n, &mut self.scratch)?;
        Ok(n)
    }

    /// Reader bounded to the rest of the current entry's content.
    pub fn content(&mut self) -> ContentReader<'_, S> {
        ContentReader { scanner: self }
    }
}

/// `Read` adaptor over one entry's content.
pub struct ContentReader<'a, S> {
    scanner: &'a mut Scanner<S>,
}

impl<S: SkipRead> Read for ContentReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let max = (buf.len() as u64).min(self.scanner.pending) as usize;
        if max == 0 {
            return Ok(0);
        }
        let n = self.scanner.src.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                "archive ended inside entry content",
            ));
        }
        self.scanner.pending -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::header::encode_header;
    use crate::engine::stream::{DrainSkip, SeekSkip};
    use crate::error::ArchiveError;
    use crate::types::EntryMeta;
    use std::io::Cursor;

    const META: EntryMeta = EntryMeta {
        mode: 0o100644,
        uid: 1000,
        gid: 1000,
        mtime: 1_700_000_000,
    };

    fn entry(name: &[u8], content: &[u8]) -> Vec<u8> {
        let header = EntryHeader::new(name.len() as u32, content.len() as u64, META);
        let mut out = encode_header(&header).to_vec();
        out.extend_from_slice(name);
        out.extend_from_slice(content);
        out
    }

    fn two_entries() -> Vec<u8> {
        let mut data = entry(b"alpha", b"first content");
        data.extend(entry(b"beta", b"second"));
        data
    }

    fn seeking(data: Vec<u8>) -> Scanner<SeekSkip<Cursor<Vec<u8>>>> {
        Scanner::new(SeekSkip::new(Cursor::new(data), 4).unwrap(), 4, 1 << 20)
    }

    fn draining(data: &[u8]) -> Scanner<DrainSkip<&[u8]>> {
        Scanner::new(DrainSkip::new(data), 4, 1 << 20)
    }

    #[test]
    fn test_empty_archive() {
        assert!(draining(&[]).next_entry().unwrap().is_none());
        assert!(seeking(Vec::new()).next_entry().unwrap().is_none());
    }

    #[test]
    fn test_skips_unconsumed_content() {
        let data = two_entries();
        let mut scanner = draining(&data);
        let first = scanner.next_entry().unwrap().unwrap();
        assert_eq!(first.name, b"alpha");
        assert_eq!(first.header.meta(), META);
        assert_eq!(first.header.content_len, 13);

        let second = scanner.next_entry().unwrap().unwrap();
        assert_eq!(second.name, b"beta");
        assert!(scanner.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_copy_content() {
        let mut scanner = seeking(two_entries());
        scanner.next_entry().unwrap();
        scanner.skip_content().unwrap();
        scanner.next_entry().unwrap();
        let mut out = Vec::new();
        assert_eq!(scanner.copy_content(&mut out).unwrap(), 6);
        assert_eq!(out, b"second");
        assert!(scanner.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_partial_read_then_advance() {
        let data = two_entries();
        let mut scanner = draining(&data);
        scanner.next_entry().unwrap();
        let mut head = [0u8; 5];
        scanner.content().read_exact(&mut head).unwrap();
        assert_eq!(&head, b"first");
        assert_eq!(scanner.next_entry().unwrap().unwrap().name, b"beta");
    }

    #[test]
    fn test_content_reader_stops_at_entry_end() {
        let data = two_entries();
        let mut scanner = draining(&data);
        scanner.next_entry().unwrap();
        let mut content = Vec::new();
        scanner.content().read_to_end(&mut content).unwrap();
        assert_eq!(content, b"first content");
    }

    #[test]
    fn test_partial_header_is_corrupt() {
        let mut data = two_entries();
        data.extend_from_slice(&[1, 2, 3]);
        let mut scanner = draining(&data);
        scanner.next_entry().unwrap();
        scanner.next_entry().unwrap();
        let err = scanner.next_entry().unwrap_err();
        assert!(matches!(err, ArchiveError::Format(FormatError::Corrupt(_))));
    }

    #[test]
    fn test_zero_name_len_is_corrupt() {
        let mut data = entry(b"x", b"");
        data[..4].copy_from_slice(&0u32.to_le_bytes());
        let err = draining(&data).next_entry().unwrap_err();
        assert!(matches!(err, ArchiveError::Format(FormatError::Corrupt(_))));
    }

    #[test]
    fn test_oversized_name_len_is_corrupt() {
        let mut data = entry(b"x", b"");
        data[..4].copy_from_slice(&((1u32 << 20) + 1).to_le_bytes());
        let err = draining(&data).next_entry().unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_truncated_name() {
        let data = entry(b"a-long-name", b"");
        let err = draining(&data[..HEADER_SIZE + 3]).next_entry().unwrap_err();
        assert!(matches!(err, ArchiveError::Io(IoError::Truncated { .. })));
    }

    #[test]
    fn test_truncated_content_detected_by_seek() {
        let data = two_entries();
        let cut = data.len() - 2;
        let mut scanner = seeking(data[..cut].to_vec());
        scanner.next_entry().unwrap();
        scanner.next_entry().unwrap();
        let err = scanner.next_entry().unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_truncated_content_detected_by_drain() {
        let data = two_entries();
        let cut = data.len() - 2;
        let mut scanner = draining(&data[..cut]);
        scanner.next_entry().unwrap();
        scanner.next_entry().unwrap();
        let err = scanner.next_entry().unwrap_err();
        assert!(matches!(err, ArchiveError::Io(IoError::Truncated { .. })));
    }
}
