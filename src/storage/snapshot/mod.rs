//! Snapshot Module
//!
//! Immutable on-disk image of an object store at a WAL position.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "STKV" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry, sorted by key ...        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   LastLsn: u64 (8) | DataCRC: u32 (4) | Padding (4)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A snapshot holds the full live state, so there are no tombstones.
//! `LastLsn` is the last WAL entry folded into the image; replay skips
//! anything at or below it.

mod builder;
mod reader;

use std::path::PathBuf;

pub use builder::SnapshotBuilder;
pub use reader::{SnapshotIterator, SnapshotReader};

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic bytes identifying a StashKV snapshot file
pub(crate) const MAGIC: &[u8; 4] = b"STKV";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: LastLsn (8) + DataCRC (4) + Padding (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

// =============================================================================
// Snapshot Metadata
// =============================================================================

/// Metadata of a written snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Path to the snapshot file
    pub path: PathBuf,
    /// Number of entries in this snapshot
    pub entry_count: u64,
    /// Last WAL LSN covered by this snapshot
    pub last_lsn: u64,
    /// File size in bytes
    pub file_size: u64,
}
