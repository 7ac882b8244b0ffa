//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean or empty WAL
//! - Recovery with partial writes (torn tail is cut off)
//! - Recovery with corrupted entries (CRC mismatch)
//! - Verify mode reports the same stats without touching the file

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use stashkv::config::WalSyncStrategy;
use stashkv::wal::{Operation, WalEntry, WalRecovery, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(key: &str, value: &str) -> Operation {
    Operation::Put {
        key: key.to_string(),
        value: value.as_bytes().to_vec(),
    }
}

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(put(&format!("key{}", i), "value")).unwrap();
    }
}

/// Write raw frames followed by arbitrary trailing bytes
fn write_raw(path: &Path, entries: &[WalEntry], tail: &[u8]) {
    let mut file = File::create(path).unwrap();
    for entry in entries {
        file.write_all(&entry.serialize().unwrap()).unwrap();
    }
    file.write_all(tail).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 10);
    assert!(!result.was_truncated);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, (i + 1) as u64);
    }
}

// =============================================================================
// Partial Write Tests
// =============================================================================

#[test]
fn test_recover_partial_header_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, &[WalEntry::new(1, put("k", "v"))], &[0u8; 8]);
    let good_len = WalEntry::new(1, put("k", "v")).serialize().unwrap().len() as u64;

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
    assert_eq!(result.entries_corrupted, 0);

    // the torn tail is gone from disk
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good_len);
}

#[test]
fn test_recover_partial_data_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut torn = WalEntry::new(2, put("k2", "v2")).serialize().unwrap();
    torn.truncate(20); // header + 4 payload bytes
    write_raw(&wal_path, &[WalEntry::new(1, put("k", "v"))], &torn);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(result.was_truncated);

    // a writer can append again after recovery
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.append(put("k3", "v3")).unwrap(), 2);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_recover_stops_at_corrupted_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bad = WalEntry::new(2, put("k2", "v2")).serialize().unwrap();
    if let Some(byte) = bad.last_mut() {
        *byte ^= 0xFF;
    }
    let mut tail = bad;
    tail.extend(WalEntry::new(3, put("k3", "v3")).serialize().unwrap());
    write_raw(&wal_path, &[WalEntry::new(1, put("k1", "v1"))], &tail);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    // entries after the damaged one are not trusted
    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_corruption_at_first_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = WalEntry::new(1, put("k", "v")).serialize().unwrap();
    bytes[20] ^= 0xFF;
    write_raw(&wal_path, &[], &bytes);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 0);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, &[WalEntry::new(1, put("k", "v"))], &[0u8; 5]);
    let before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), before);
}

#[test]
fn test_recover_and_verify_agree() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 20);

    let (entries, recovered) = WalRecovery::recover(&wal_path).unwrap();
    let verified = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(entries.len() as u64, recovered.entries_recovered);
    assert_eq!(recovered, verified);
}
