//! Storage Module
//!
//! Persistent state of the transactional backend besides the WAL.
//!
//! ## Responsibilities
//! - Checkpoint snapshots: the full store image at a WAL position
//! - Snapshot discovery, loading and pruning
//! - The database manifest (version + object stores)
//!
//! ## On-disk Layout
//! ```text
//! {data_dir}/{database}/
//! ├── MANIFEST                      (JSON: database, version, stores)
//! └── {store}/
//!     ├── wal.log
//!     └── snapshots/
//!         └── snapshot_NNNNNN.snap
//! ```

mod manager;
mod manifest;
mod snapshot;

pub use manager::{LoadedSnapshot, SnapshotManager};
pub use manifest::Manifest;
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotIterator, SnapshotReader};
