//! FLATAR - Entry Header Codec
//! Fixed-layout binary encoding of the record that precedes every entry.

use bytes::{Buf, BufMut};

use crate::error::FormatError;
use crate::types::EntryMeta;

/// Size of an encoded header in bytes.
pub const HEADER_SIZE: usize = 4 + 8 + 4 + 4 + 4 + 8 + 1;

/// Header preceding each entry's name and content.
///
/// ## Binary Format (little-endian, no padding)
/// ```text
/// [name_len: 4][content_len: 8][mode: 4][uid: 4][gid: 4][mtime: 8 (signed)][deleted: 1]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub name_len: u32,
    pub content_len: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: i64,
    /// Reserved tombstone flag. Never set by this crate.
    pub deleted: bool,
}

impl EntryHeader {
    /// Build a live header for a new entry.
    pub fn new(name_len: u32, content_len: u64, meta: EntryMeta) -> Self {
        Self {
            name_len,
            content_len,
            mode: meta.mode,
            uid: meta.uid,
            gid: meta.gid,
            mtime: meta.mtime,
            deleted: false,
        }
    }

    /// Metadata carried by this header.
    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            mtime: self.mtime,
        }
    }
}

/// Encode a header into its fixed-size representation.
pub fn encode_header(h: &EntryHeader) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    let mut buf = &mut out[..];
    buf.put_u32_le(h.name_len);
    buf.put_u64_le(h.content_len);
    buf.put_u32_le(h.mode);
    buf.put_u32_le(h.uid);
    buf.put_u32_le(h.gid);
    buf.put_i64_le(h.mtime);
    buf.put_u8(h.deleted as u8);
    out
}

/// Decode a header from the first `HEADER_SIZE` bytes of `bytes`.
/// Anything after the header is ignored.
pub fn decode_header(bytes: &[u8]) -> Result<EntryHeader, FormatError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FormatError::Truncated {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    }

    let mut buf = &bytes[..HEADER_SIZE];
    Ok(EntryHeader {
        name_len: buf.get_u32_le(),
        content_len: buf.get_u64_le(),
        mode: buf.get_u32_le(),
        uid: buf.get_u32_le(),
        gid: buf.get_u32_le(),
        mtime: buf.get_i64_le(),
        deleted: buf.get_u8() != 0,
    })
}
