//! Tests for SnapshotManager
//!
//! These tests verify:
//! - Opening/creating snapshot directories
//! - Writing snapshots from a MemTable and loading them back
//! - Only the newest snapshot is kept
//! - Leftover temp files are cleaned up on open

use std::fs;
use std::path::PathBuf;

use stashkv::memtable::MemTable;
use stashkv::storage::SnapshotManager;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_storage() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshots");
    (temp_dir, path)
}

fn memtable_with(entries: &[(&str, &str)]) -> MemTable {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_directory() {
    let (_temp, path) = setup_temp_storage();
    assert!(!path.exists());

    let manager = SnapshotManager::open(&path).unwrap();

    assert!(path.is_dir());
    assert_eq!(manager.snapshot_count(), 0);
}

#[test]
fn test_load_latest_without_snapshots_is_empty() {
    let (_temp, path) = setup_temp_storage();
    let manager = SnapshotManager::open(&path).unwrap();

    let loaded = manager.load_latest().unwrap();
    assert!(loaded.entries.is_empty());
    assert_eq!(loaded.last_lsn, 0);
}

// =============================================================================
// Write + Load Tests
// =============================================================================

#[test]
fn test_write_then_load() {
    let (_temp, path) = setup_temp_storage();
    let mut manager = SnapshotManager::open(&path).unwrap();

    let snapshot = manager
        .write(&memtable_with(&[("b", "2"), ("a", "1")]), 9)
        .unwrap();
    assert_eq!(snapshot.entry_count, 2);
    assert_eq!(snapshot.last_lsn, 9);

    let loaded = manager.load_latest().unwrap();
    assert_eq!(loaded.last_lsn, 9);
    assert_eq!(
        loaded.entries,
        vec![
            ("a".to_string(), b"1".to_vec()),
            ("b".to_string(), b"2".to_vec()),
        ]
    );
}

#[test]
fn test_newer_snapshot_replaces_older() {
    let (_temp, path) = setup_temp_storage();
    let mut manager = SnapshotManager::open(&path).unwrap();

    manager.write(&memtable_with(&[("a", "1")]), 1).unwrap();
    manager.write(&memtable_with(&[("a", "2")]), 2).unwrap();
    assert_eq!(manager.snapshot_count(), 1);

    let files: Vec<_> = fs::read_dir(&path).unwrap().collect();
    assert_eq!(files.len(), 1);

    let loaded = manager.load_latest().unwrap();
    assert_eq!(loaded.entries, vec![("a".to_string(), b"2".to_vec())]);
}

#[test]
fn test_reopen_discovers_snapshot() {
    let (_temp, path) = setup_temp_storage();
    {
        let mut manager = SnapshotManager::open(&path).unwrap();
        manager.write(&memtable_with(&[("k", "v")]), 4).unwrap();
    }

    let manager = SnapshotManager::open(&path).unwrap();
    assert_eq!(manager.snapshot_count(), 1);
    assert_eq!(manager.load_latest().unwrap().last_lsn, 4);
}

#[test]
fn test_open_removes_unfinished_snapshots() {
    let (_temp, path) = setup_temp_storage();
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("snapshot_000003.tmp"), b"partial").unwrap();

    let manager = SnapshotManager::open(&path).unwrap();

    assert_eq!(manager.snapshot_count(), 0);
    assert!(!path.join("snapshot_000003.tmp").exists());
}
