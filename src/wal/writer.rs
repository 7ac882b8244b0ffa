//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, StashError};

use super::reader::{Frame, WalReader};
use super::{Operation, WalEntry};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN the next append receives
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    /// Entries currently in the file
    entry_count: usize,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Appends continue after the last valid entry already in the file.
    /// Run recovery first if the file may end in a torn write.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let (last_lsn, entry_count) = if path.exists() {
            scan(path)?
        } else {
            (0, 0)
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            entry_count,
        })
    }

    /// Append an operation, returning its LSN
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operation).serialize()?;

        self.writer.write_all(&frame)?;
        self.next_lsn += 1;
        self.unsynced += 1;
        self.entry_count += 1;

        let must_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if must_sync {
            self.sync()?;
        } else {
            self.writer.flush()?;
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry (after a checkpoint made them durable elsewhere)
    ///
    /// LSNs keep increasing across truncations.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;
        self.unsynced = 0;
        self.entry_count = 0;
        Ok(())
    }

    /// Make sure the next LSN is greater than `lsn`
    ///
    /// Used after a checkpoint emptied the log, so new entries never reuse
    /// LSNs already folded into a snapshot.
    pub fn advance_past(&mut self, lsn: u64) {
        self.next_lsn = self.next_lsn.max(lsn + 1);
    }

    /// Get the LSN the next append receives
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Appends not yet fsynced
    pub fn uncommitted_count(&self) -> usize {
        self.unsynced
    }

    /// Entries currently in the log
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Last LSN and entry count of the valid prefix of an existing log
fn scan(path: &Path) -> Result<(u64, usize)> {
    let mut reader = WalReader::open(path)?;
    let mut last_lsn = 0;
    let mut count = 0;
    loop {
        match reader.next_frame()? {
            Frame::Entry(entry) => {
                last_lsn = entry.lsn;
                count += 1;
            }
            Frame::End => break,
            Frame::Torn | Frame::Corrupt(_) => {
                return Err(StashError::WalCorruption(format!(
                    "{} has a damaged tail at offset {}; recover it before appending",
                    path.display(),
                    reader.position()
                )))
            }
        }
    }
    Ok((last_lsn, count))
}
