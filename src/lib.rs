//! FLATAR - Flat-File Archive Engine
//!
//! An append-oriented binary container storing named blobs together with
//! their POSIX metadata (mode, owner, group, modification time).
//!
//! ## Features
//! - **Fixed Header Codec**: 33-byte little-endian entry headers
//! - **Streaming Scanner**: Entries are visited one at a time, content is never buffered whole
//! - **Corruption Detection**: Truncated headers, names and content are reported, not ignored
//! - **Atomic Compaction**: Every mutation rewrites into a side file and commits with one rename
//! - **Move Semantics**: Extraction restores metadata and removes the entry from the archive
//!
//! ## Format
//! ```text
//! [header: 33 bytes][name: name_len bytes][content: content_len bytes] ... EOF
//! ```
//!
//! ## Example
//! ```no_run
//! use flatar::{config::Config, engine::Archive};
//!
//! let archive = Archive::open(Config::new("backup.far")).unwrap();
//! archive.add("notes.txt").unwrap();
//! for entry in archive.list().unwrap() {
//!     println!("{} {}", entry.display_name(), entry.content_len);
//! }
//! archive.extract(b"notes.txt").unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod types;
