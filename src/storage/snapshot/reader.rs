//! Snapshot Reader
//!
//! Opens snapshot files, verifies them and iterates their entries.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, StashError};

use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Reader for snapshot files
///
/// `open` checks the header and footer and verifies the data CRC before
/// any entry is handed out.
pub struct SnapshotReader {
    path: PathBuf,
    file: BufReader<File>,
    entry_count: u64,
    last_lsn: u64,
    /// Offset where the footer starts
    data_end: u64,
}

impl SnapshotReader {
    /// Open and verify a snapshot
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(path, "file too small"));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(StashError::Storage(format!(
                "Invalid snapshot magic in {}: expected STKV, got {:?}",
                path.display(),
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(StashError::Storage(format!(
                "Unsupported snapshot version: {}",
                version
            )));
        }

        let entry_count = read_u64(&header[6..14]);

        let data_end = file_size - FOOTER_SIZE;
        file.seek(SeekFrom::Start(data_end))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let last_lsn = read_u64(&footer[0..8]);
        let stored_crc = read_u32(&footer[8..12]);

        // Verify the data block in one pass before trusting it
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut hasher = crc32fast::Hasher::new();
        let mut remaining = data_end - HEADER_SIZE;
        let mut chunk = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            file.read_exact(&mut chunk[..n])?;
            hasher.update(&chunk[..n]);
            remaining -= n as u64;
        }
        let crc = hasher.finalize();
        if crc != stored_crc {
            return Err(corrupt(
                path,
                &format!("CRC mismatch: stored {:08x}, computed {:08x}", stored_crc, crc),
            ));
        }

        file.seek(SeekFrom::Start(HEADER_SIZE))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            entry_count,
            last_lsn,
            data_end,
        })
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Last WAL LSN folded into this snapshot
    pub fn last_lsn(&self) -> u64 {
        self.last_lsn
    }

    /// Iterate over all entries in key order
    pub fn iter(&mut self) -> Result<SnapshotIterator<'_>> {
        self.file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(SnapshotIterator {
            path: &self.path,
            file: &mut self.file,
            current_offset: HEADER_SIZE,
            end_offset: self.data_end,
        })
    }

    /// Load every entry, checking the count against the header
    pub fn load(&mut self) -> Result<Vec<(String, Vec<u8>)>> {
        let entries = self.iter()?.collect::<Result<Vec<_>>>()?;
        if entries.len() as u64 != self.entry_count {
            return Err(corrupt(
                &self.path,
                &format!(
                    "header says {} entries, data block holds {}",
                    self.entry_count,
                    entries.len()
                ),
            ));
        }
        Ok(entries)
    }
}

/// Iterator over snapshot entries in sorted key order
pub struct SnapshotIterator<'a> {
    path: &'a Path,
    file: &'a mut BufReader<File>,
    current_offset: u64,
    /// Stop reading when we reach this offset (start of footer)
    end_offset: u64,
}

impl<'a> SnapshotIterator<'a> {
    fn read_entry(&mut self) -> Result<(String, Vec<u8>)> {
        if self.current_offset + 8 > self.end_offset {
            return Err(corrupt(self.path, "entry header runs into footer"));
        }
        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;

        let key_len = read_u32(&header[0..4]) as u64;
        let val_len = read_u32(&header[4..8]) as u64;
        let entry_size = 8 + key_len + val_len;
        if self.current_offset + entry_size > self.end_offset {
            return Err(corrupt(self.path, "entry runs into footer"));
        }

        let mut key = vec![0u8; key_len as usize];
        self.file.read_exact(&mut key)?;
        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;

        let key = String::from_utf8(key).map_err(|_| corrupt(self.path, "key is not UTF-8"))?;
        self.current_offset += entry_size;
        Ok((key, value))
    }
}

impl<'a> Iterator for SnapshotIterator<'a> {
    type Item = Result<(String, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_offset >= self.end_offset {
            return None;
        }
        let entry = self.read_entry();
        if entry.is_err() {
            // do not keep reading from an unknown position
            self.current_offset = self.end_offset;
        }
        Some(entry)
    }
}

fn corrupt(path: &Path, reason: &str) -> StashError {
    StashError::Storage(format!("Corrupt snapshot {}: {}", path.display(), reason))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
