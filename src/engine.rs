//! Engine Module
//!
//! The storage engine behind one object store of the transactional backend.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and snapshots
//! - Log every mutation before applying it
//! - Checkpoint the MemTable into a snapshot and empty the WAL
//! - Manage crash recovery on startup

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, WalSyncStrategy};
use crate::error::Result;
use crate::memtable::MemTable;
use crate::storage::SnapshotManager;
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Durability settings of an engine
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// How often to fsync the WAL
    pub wal_sync_strategy: WalSyncStrategy,
    /// WAL entries between checkpoints (0 disables automatic checkpoints)
    pub checkpoint_threshold: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            wal_sync_strategy: config.wal_sync_strategy,
            checkpoint_threshold: config.checkpoint_threshold,
        }
    }
}

/// The storage engine of one object store
///
/// ## Concurrency Model: Single Owner
///
/// The engine is owned by the transactional worker thread, which applies
/// requests one at a time. Every method takes `&self` or `&mut self`
/// directly; there are no locks.
///
/// ## Durability
///
/// - Writes append to the WAL first, then update the MemTable
/// - A checkpoint writes the whole MemTable as a snapshot, then truncates
///   the WAL
/// - On open, the newest snapshot is loaded and the WAL is replayed on top
pub struct Engine {
    /// Directory of this store
    dir: PathBuf,

    /// Write-ahead log for durability
    wal: WalWriter,

    /// Full live state of the store
    memtable: MemTable,

    /// Checkpoint snapshots
    snapshots: SnapshotManager,

    options: EngineOptions,

    /// WAL entries appended since the last checkpoint
    uncheckpointed: usize,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SNAPSHOT_DIR: &'static str = "snapshots";

    /// Open or create the engine of a store directory
    ///
    /// On startup:
    /// 1. Create the store directory if it doesn't exist
    /// 2. Load the newest snapshot
    /// 3. Recover the WAL and replay entries newer than the snapshot
    /// 4. Checkpoint if anything was replayed
    pub fn open(dir: &Path, options: EngineOptions) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let wal_path = dir.join(Self::WAL_FILENAME);
        let snapshots = SnapshotManager::open(&dir.join(Self::SNAPSHOT_DIR))?;

        // Step 1: Base image from the newest snapshot
        let snapshot = snapshots.load_latest()?;
        let snapshot_lsn = snapshot.last_lsn;
        let mut memtable: MemTable = snapshot.entries.into_iter().collect();

        // Step 2: Replay the WAL tail on top of it
        let mut replayed = 0usize;
        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    store = %dir.display(),
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    "WAL recovery"
                );
            }

            for entry in entries {
                // already folded into the snapshot
                if entry.lsn <= snapshot_lsn {
                    continue;
                }
                memtable.apply(entry.operation);
                replayed += 1;
            }
        }

        let mut wal = WalWriter::open(&wal_path, options.wal_sync_strategy)?;
        wal.advance_past(snapshot_lsn);

        let mut engine = Self {
            dir: dir.to_path_buf(),
            uncheckpointed: wal.entry_count(),
            wal,
            memtable,
            snapshots,
            options,
        };

        // Step 3: Make the recovered state durable in a snapshot
        if replayed > 0 {
            tracing::debug!(entries = replayed, "Checkpointing replayed WAL entries");
            engine.checkpoint()?;
        }

        Ok(engine)
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.memtable.get(key).map(<[u8]>::to_vec)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Write to WAL (durability)
    /// 2. Write to MemTable
    /// 3. Checkpoint if the WAL grew past the threshold
    pub fn put(&mut self, key: String, value: Vec<u8>) -> Result<()> {
        self.wal.append(Operation::Put {
            key: key.clone(),
            value: value.clone(),
        })?;
        self.memtable.put(key, value);
        self.after_write()
    }

    /// Delete a key, returning whether it existed
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        if !self.memtable.contains(key) {
            return Ok(false);
        }
        self.wal.append(Operation::Delete {
            key: key.to_string(),
        })?;
        self.memtable.delete(key);
        self.after_write()?;
        Ok(true)
    }

    /// Remove every key
    pub fn clear(&mut self) -> Result<()> {
        self.wal.append(Operation::Clear)?;
        self.memtable.clear();
        self.after_write()
    }

    /// All keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.memtable.keys()
    }

    pub fn len(&self) -> usize {
        self.memtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.memtable.contains(key)
    }

    /// Write a snapshot of the current state and empty the WAL
    pub fn checkpoint(&mut self) -> Result<()> {
        let last_lsn = self.wal.current_lsn().saturating_sub(1);
        let snapshot = self.snapshots.write(&self.memtable, last_lsn)?;
        self.wal.truncate()?;
        self.uncheckpointed = 0;

        tracing::debug!(
            store = %self.dir.display(),
            entries = snapshot.entry_count,
            last_lsn,
            bytes = snapshot.file_size,
            "Checkpoint written"
        );
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Checkpoints pending WAL entries and syncs to disk
    pub fn close(mut self) -> Result<()> {
        if self.uncheckpointed > 0 {
            self.checkpoint()?;
        }
        self.wal.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the store directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the approximate size of the live data in bytes
    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    /// WAL entries not yet folded into a snapshot
    pub fn wal_entry_count(&self) -> usize {
        self.wal.entry_count()
    }

    /// Get the number of snapshots on disk
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.snapshot_count()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn after_write(&mut self) -> Result<()> {
        self.uncheckpointed += 1;
        let threshold = self.options.checkpoint_threshold;
        if threshold > 0 && self.uncheckpointed >= threshold {
            self.checkpoint()?;
        }
        Ok(())
    }
}
