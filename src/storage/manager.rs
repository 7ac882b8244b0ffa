//! Snapshot Manager
//!
//! Tracks the checkpoint snapshots of one object store.
//!
//! ## Responsibilities
//! - Discover existing snapshots on startup
//! - Load the newest snapshot into memory
//! - Write new snapshots from the MemTable at checkpoints
//! - Remove superseded snapshots

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::memtable::MemTable;

use super::{Snapshot, SnapshotBuilder, SnapshotReader};

/// Contents of the newest snapshot
#[derive(Debug, Default)]
pub struct LoadedSnapshot {
    /// Entries in key order
    pub entries: Vec<(String, Vec<u8>)>,
    /// Last WAL LSN covered by the snapshot (0 when there is none)
    pub last_lsn: u64,
}

/// Manages the snapshot directory of a store
///
/// Owned by the store engine, which is itself confined to one worker
/// thread, so no interior locking is needed.
pub struct SnapshotManager {
    /// Directory where snapshots are stored
    dir: PathBuf,

    /// Ids of snapshots on disk, oldest first
    snapshot_ids: Vec<u64>,

    /// Next ID for creating new snapshots
    next_snapshot_id: u64,
}

impl SnapshotManager {
    /// Open or create the snapshot directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing snapshot files
    /// 3. Drop leftover `.tmp` files from interrupted checkpoints
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut snapshot_ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().is_some_and(|ext| ext == "tmp") {
                tracing::debug!(path = %path.display(), "Removing unfinished snapshot");
                fs::remove_file(&path)?;
                continue;
            }
            if let Some(id) = Self::parse_snapshot_id(&path) {
                snapshot_ids.push(id);
            }
        }
        snapshot_ids.sort_unstable();

        let next_snapshot_id = snapshot_ids.last().map(|&id| id + 1).unwrap_or(1);

        Ok(Self {
            dir: dir.to_path_buf(),
            snapshot_ids,
            next_snapshot_id,
        })
    }

    /// Load the newest snapshot, or an empty image when none exists
    pub fn load_latest(&self) -> Result<LoadedSnapshot> {
        let Some(&id) = self.snapshot_ids.last() else {
            return Ok(LoadedSnapshot::default());
        };

        let mut reader = SnapshotReader::open(&self.snapshot_path(id))?;
        let entries = reader.load()?;
        tracing::debug!(
            snapshot = id,
            entries = entries.len(),
            last_lsn = reader.last_lsn(),
            "Loaded snapshot"
        );

        Ok(LoadedSnapshot {
            entries,
            last_lsn: reader.last_lsn(),
        })
    }

    /// Write a snapshot of the MemTable and remove older ones
    pub fn write(&mut self, memtable: &MemTable, last_lsn: u64) -> Result<Snapshot> {
        let id = self.next_snapshot_id;
        self.next_snapshot_id += 1;

        let mut builder = SnapshotBuilder::new(&self.snapshot_path(id))?;
        for (key, value) in memtable.iter() {
            builder.add(key, value)?;
        }
        let snapshot = builder.finish(last_lsn)?;

        // Only the newest snapshot is ever read back
        for old in std::mem::take(&mut self.snapshot_ids) {
            fs::remove_file(self.snapshot_path(old))?;
        }
        self.snapshot_ids.push(id);

        Ok(snapshot)
    }

    /// Get the number of snapshots on disk
    pub fn snapshot_count(&self) -> usize {
        self.snapshot_ids.len()
    }

    /// Get the snapshot directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn snapshot_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("snapshot_{:06}.snap", id))
    }

    /// "snapshot_000042.snap" → Some(42)
    fn parse_snapshot_id(path: &Path) -> Option<u64> {
        if path.extension()? != "snap" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix("snapshot_")?.parse().ok()
    }
}
