//! MemTable Module
//!
//! In-memory image of one object store.
//!
//! ## Responsibilities
//! - Hold the full live state of the store between checkpoints
//! - Apply replayed WAL operations
//! - Track approximate size in bytes
//! - Ordered iteration for snapshot creation
//!
//! ## Data Structure Choice
//! A plain BTreeMap without locks: the memtable is owned by the single
//! worker thread that serializes every store request.
//! - Ordered keys (snapshots and key listings come out sorted)
//! - Deletes remove entries outright; snapshots hold the whole state,
//!   so no tombstones are needed

mod table;

pub use table::MemTable;
