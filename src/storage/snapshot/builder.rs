//! Snapshot Builder
//!
//! Writes sorted key-value entries to a new snapshot file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StashError};

use super::{Snapshot, MAGIC, VERSION};

/// Builder for creating new snapshots from sorted entries
///
/// Entries go to a `.tmp` sibling that is renamed into place by `finish()`,
/// so a crash mid-build never leaves a half-written snapshot under the
/// final name.
pub struct SnapshotBuilder {
    /// Final snapshot path
    path: PathBuf,
    /// Path being written
    tmp_path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u64,
    /// Last key written, to enforce ordering
    last_key: Option<String>,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
}

impl SnapshotBuilder {
    /// Create a new snapshot builder
    ///
    /// Writes header immediately; call `add()` in sorted order,
    /// then `finish()` to write the footer.
    pub fn new(path: &Path) -> Result<Self> {
        let tmp_path = path.with_extension("tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut writer = BufWriter::new(file);

        // Write header (entry_count placeholder, will be updated in finish)
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer,
            entry_count: 0,
            last_key: None,
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value pair (must be called in strictly increasing key order)
    pub fn add(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last.as_str() {
                return Err(StashError::Storage(format!(
                    "snapshot keys out of order: {:?} after {:?}",
                    key, last
                )));
            }
        }

        // Entry bytes: [key_len(4)][val_len(4)][key][value]
        let key_len_bytes = (key.len() as u32).to_le_bytes();
        let val_len_bytes = (value.len() as u32).to_le_bytes();

        self.writer.write_all(&key_len_bytes)?;
        self.writer.write_all(&val_len_bytes)?;
        self.writer.write_all(key.as_bytes())?;
        self.writer.write_all(value)?;

        self.data_hasher.update(&key_len_bytes);
        self.data_hasher.update(&val_len_bytes);
        self.data_hasher.update(key.as_bytes());
        self.data_hasher.update(value);

        self.entry_count += 1;
        self.last_key = Some(key.to_string());
        Ok(())
    }

    /// Finish building: write footer, fix the header count and publish
    pub fn finish(mut self, last_lsn: u64) -> Result<Snapshot> {
        let data_crc = self.data_hasher.finalize();

        // Footer: last_lsn (8) + data_crc (4) + padding (4)
        self.writer.write_all(&last_lsn.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| StashError::Storage(format!("Failed to flush snapshot: {}", e)))?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();
        drop(file);
        fs::rename(&self.tmp_path, &self.path)?;

        Ok(Snapshot {
            path: self.path,
            entry_count: self.entry_count,
            last_lsn,
            file_size,
        })
    }
}
