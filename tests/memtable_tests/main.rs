//! MemTable Tests
//!
//! Tests verify:
//! - Basic CRUD operations
//! - Size tracking
//! - Replay of WAL operations
//! - Sorted iteration

use stashkv::memtable::MemTable;
use stashkv::wal::Operation;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.len(), 0);
    assert_eq!(memtable.size(), 0);
    assert!(memtable.is_empty());
}

#[test]
fn test_put_and_get() {
    let mut memtable = MemTable::new();
    memtable.put("key1".to_string(), b"value1".to_vec());

    assert_eq!(memtable.get("key1"), Some(&b"value1"[..]));
    assert_eq!(memtable.get("missing"), None);
}

#[test]
fn test_put_overwrites_existing() {
    let mut memtable = MemTable::new();
    memtable.put("key1".to_string(), b"value1".to_vec());
    memtable.put("key1".to_string(), b"v2".to_vec());

    assert_eq!(memtable.len(), 1);
    assert_eq!(memtable.get("key1"), Some(&b"v2"[..]));
}

#[test]
fn test_delete_removes_entry() {
    let mut memtable = MemTable::new();
    memtable.put("key1".to_string(), b"value1".to_vec());

    assert!(memtable.delete("key1"));
    assert!(!memtable.delete("key1"));
    assert!(!memtable.contains("key1"));
    assert!(memtable.is_empty());
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn test_size_tracks_keys_and_values() {
    let mut memtable = MemTable::new();
    memtable.put("abc".to_string(), vec![0; 10]);
    assert_eq!(memtable.size(), 13);

    // shrinking value
    memtable.put("abc".to_string(), vec![0; 4]);
    assert_eq!(memtable.size(), 7);

    // growing value
    memtable.put("abc".to_string(), vec![0; 20]);
    assert_eq!(memtable.size(), 23);

    memtable.put("de".to_string(), vec![0; 1]);
    assert_eq!(memtable.size(), 26);

    memtable.delete("abc");
    assert_eq!(memtable.size(), 3);

    memtable.clear();
    assert_eq!(memtable.size(), 0);
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_apply_replays_operations() {
    let mut memtable = MemTable::new();
    memtable.apply(Operation::Put {
        key: "a".to_string(),
        value: b"1".to_vec(),
    });
    memtable.apply(Operation::Put {
        key: "b".to_string(),
        value: b"2".to_vec(),
    });
    memtable.apply(Operation::Delete {
        key: "a".to_string(),
    });

    assert_eq!(memtable.keys(), vec!["b".to_string()]);

    memtable.apply(Operation::Clear);
    assert!(memtable.is_empty());
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iteration_is_sorted() {
    let memtable: MemTable = [("zebra", "z"), ("apple", "a"), ("mango", "m")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect();

    let keys: Vec<&str> = memtable.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["apple", "mango", "zebra"]);
    assert_eq!(memtable.keys(), vec!["apple", "mango", "zebra"]);
}
