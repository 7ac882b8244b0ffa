//! Tests for snapshot files
//!
//! These tests verify:
//! - Builder writes header, entries and footer that the reader accepts
//! - Keys must be added in increasing order
//! - Corruption is detected before any entry is returned

use std::fs;
use std::path::PathBuf;

use stashkv::storage::{SnapshotBuilder, SnapshotReader};
use stashkv::StashError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_snapshot() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot_000001.snap");
    (temp_dir, path)
}

fn build(path: &PathBuf, entries: &[(&str, &[u8])], last_lsn: u64) {
    let mut builder = SnapshotBuilder::new(path).unwrap();
    for (key, value) in entries {
        builder.add(key, value).unwrap();
    }
    builder.finish(last_lsn).unwrap();
}

// =============================================================================
// Build + Read Tests
// =============================================================================

#[test]
fn test_build_and_load() {
    let (_temp, path) = setup_temp_snapshot();
    build(&path, &[("a", b"1"), ("b", b""), ("c", b"333")], 17);

    let mut reader = SnapshotReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 3);
    assert_eq!(reader.last_lsn(), 17);

    let entries = reader.load().unwrap();
    assert_eq!(
        entries,
        vec![
            ("a".to_string(), b"1".to_vec()),
            ("b".to_string(), vec![]),
            ("c".to_string(), b"333".to_vec()),
        ]
    );
}

#[test]
fn test_empty_snapshot() {
    let (_temp, path) = setup_temp_snapshot();
    build(&path, &[], 0);

    let mut reader = SnapshotReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 0);
    assert!(reader.load().unwrap().is_empty());
}

#[test]
fn test_finish_leaves_no_temp_file() {
    let (temp, path) = setup_temp_snapshot();
    build(&path, &[("k", b"v")], 1);

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["snapshot_000001.snap".to_string()]);
}

#[test]
fn test_out_of_order_keys_rejected() {
    let (_temp, path) = setup_temp_snapshot();
    let mut builder = SnapshotBuilder::new(&path).unwrap();
    builder.add("b", b"2").unwrap();

    assert!(matches!(builder.add("a", b"1"), Err(StashError::Storage(_))));
    assert!(builder.add("b", b"again").is_err());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_flipped_data_byte_detected() {
    let (_temp, path) = setup_temp_snapshot();
    build(&path, &[("key", b"value")], 5);

    let mut bytes = fs::read(&path).unwrap();
    bytes[20] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        SnapshotReader::open(&path),
        Err(StashError::Storage(_))
    ));
}

#[test]
fn test_bad_magic_detected() {
    let (_temp, path) = setup_temp_snapshot();
    build(&path, &[("key", b"value")], 5);

    let mut bytes = fs::read(&path).unwrap();
    bytes[0] = b'X';
    fs::write(&path, bytes).unwrap();

    assert!(SnapshotReader::open(&path).is_err());
}

#[test]
fn test_truncated_file_detected() {
    let (_temp, path) = setup_temp_snapshot();
    build(&path, &[("key", b"value")], 5);

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    assert!(SnapshotReader::open(&path).is_err());
}
