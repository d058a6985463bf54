//! FLATAR - Byte-Exact I/O
//! Full-read, full-write, bounded copy and skip primitives.
//!
//! Every helper retries `ErrorKind::Interrupted` and treats a zero-length
//! request as an immediate success. Short input surfaces as
//! `IoError::Truncated`, everything else the OS reports as
//! `IoError::Transport`.

use std::fs::{File, Metadata};
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::IoError;

/// Read until `buf` is full or the source is exhausted.
/// Returns the number of bytes read; less than `buf.len()` means EOF.
pub fn read_full<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> Result<usize, IoError> {
    let mut off = 0;
    while off < buf.len() {
        match src.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(IoError::transport("read", e)),
        }
    }
    Ok(off)
}

/// Fill `buf` completely or fail with `IoError::Truncated`.
pub fn read_exact_into<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> Result<(), IoError> {
    let got = read_full(src, buf)?;
    if got < buf.len() {
        return Err(IoError::Truncated {
            expected: buf.len() as u64,
            actual: got as u64,
        });
    }
    Ok(())
}

/// Read exactly `n` bytes into a fresh buffer.
pub fn read_exact<R: Read + ?Sized>(src: &mut R, n: usize) -> Result<Vec<u8>, IoError> {
    let mut buf = vec![0u8; n];
    read_exact_into(src, &mut buf)?;
    Ok(buf)
}

/// Write all of `bytes`, retrying partial writes.
pub fn write_exact<W: Write + ?Sized>(sink: &mut W, bytes: &[u8]) -> Result<(), IoError> {
    let mut off = 0;
    while off < bytes.len() {
        match sink.write(&bytes[off..]) {
            Ok(0) => {
                return Err(IoError::transport(
                    "write",
                    io::Error::from(ErrorKind::WriteZero),
                ))
            }
            Ok(n) => off += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(IoError::transport("write", e)),
        }
    }
    Ok(())
}

/// Stream exactly `n` bytes from `src` to `sink` through `scratch`.
pub fn copy_exact<R, W>(src: &mut R, sink: &mut W, n: u64, scratch: &mut [u8]) -> Result<(), IoError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut remaining = n;
    while remaining > 0 {
        let chunk = remaining.min(scratch.len() as u64) as usize;
        let got = read_full(src, &mut scratch[..chunk])?;
        if got == 0 {
            return Err(IoError::Truncated {
                expected: n,
                actual: n - remaining,
            });
        }
        write_exact(sink, &scratch[..got])?;
        remaining -= got as u64;
    }
    Ok(())
}

/// Discard `n` bytes by reading them into `scratch`.
fn drain<R: Read + ?Sized>(src: &mut R, n: u64, scratch: &mut [u8]) -> Result<(), IoError> {
    let mut remaining = n;
    while remaining > 0 {
        let chunk = remaining.min(scratch.len() as u64) as usize;
        let got = read_full(src, &mut scratch[..chunk])?;
        if got == 0 {
            return Err(IoError::Truncated {
                expected: n,
                actual: n - remaining,
            });
        }
        remaining -= got as u64;
    }
    Ok(())
}

/// A reader that can move past bytes it does not need.
pub trait SkipRead: Read {
    /// Advance past exactly `n` bytes.
    fn skip(&mut self, n: u64, scratch: &mut [u8]) -> Result<(), IoError>;
}

/// Skips by seeking. Reads go through its own buffer, and skips that land
/// inside that buffer consume it instead of refilling. The source length is
/// captured once so that a skip running past the end is reported instead of
/// silently succeeding.
pub struct SeekSkip<R> {
    inner: BufReader<R>,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> SeekSkip<R> {
    pub fn new(mut inner: R, buffer_size: usize) -> Result<Self, IoError> {
        let pos = inner
            .stream_position()
            .map_err(|e| IoError::transport("seek", e))?;
        let len = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| IoError::transport("seek", e))?;
        inner
            .seek(SeekFrom::Start(pos))
            .map_err(|e| IoError::transport("seek", e))?;
        Ok(Self {
            inner: BufReader::with_capacity(buffer_size.max(1), inner),
            pos,
            len,
        })
    }
}

impl<R: Read> Read for SeekSkip<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> SkipRead for SeekSkip<R> {
    fn skip(&mut self, n: u64, _scratch: &mut [u8]) -> Result<(), IoError> {
        if n == 0 {
            return Ok(());
        }
        let available = self.len.saturating_sub(self.pos);
        if n > available {
            return Err(IoError::Truncated {
                expected: n,
                actual: available,
            });
        }
        let offset = i64::try_from(n)
            .map_err(|_| IoError::transport("seek", io::Error::from(ErrorKind::InvalidInput)))?;
        // A plain `seek` would throw the buffered bytes away.
        self.inner
            .seek_relative(offset)
            .map_err(|e| IoError::transport("seek", e))?;
        self.pos += n;
        Ok(())
    }
}

/// Skips by reading and discarding, for sources that cannot seek.
pub struct DrainSkip<R> {
    inner: R,
}

impl<R: Read> DrainSkip<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for DrainSkip<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> SkipRead for DrainSkip<R> {
    fn skip(&mut self, n: u64, scratch: &mut [u8]) -> Result<(), IoError> {
        drain(&mut self.inner, n, scratch)
    }
}

/// An opened archive file with its skip strategy chosen once.
pub enum ArchiveSource {
    Seek(SeekSkip<File>),
    Drain(DrainSkip<BufReader<File>>),
}

impl ArchiveSource {
    /// Regular files seek; pipes, FIFOs and devices drain.
    pub fn probe(file: File, buffer_size: usize) -> Result<Self, IoError> {
        let is_file = file
            .metadata()
            .map_err(|e| IoError::transport("stat archive", e))?
            .file_type()
            .is_file();
        if is_file {
            Ok(ArchiveSource::Seek(SeekSkip::new(file, buffer_size)?))
        } else {
            let reader = BufReader::with_capacity(buffer_size, file);
            Ok(ArchiveSource::Drain(DrainSkip::new(reader)))
        }
    }

    /// Metadata of the open archive file.
    pub fn metadata(&self) -> Result<Metadata, IoError> {
        let file = match self {
            ArchiveSource::Seek(s) => s.inner.get_ref(),
            ArchiveSource::Drain(s) => s.inner.get_ref(),
        };
        file.metadata()
            .map_err(|e| IoError::transport("stat archive", e))
    }
}

impl Read for ArchiveSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ArchiveSource::Seek(s) => s.read(buf),
            ArchiveSource::Drain(s) => s.read(buf),
        }
    }
}

impl SkipRead for ArchiveSource {
    fn skip(&mut self, n: u64, scratch: &mut [u8]) -> Result<(), IoError> {
        match self {
            ArchiveSource::Seek(s) => s.skip(n, scratch),
            ArchiveSource::Drain(s) => s.skip(n, scratch),
        }
    }
}
