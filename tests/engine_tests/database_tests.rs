//! Tests for versioned databases
//!
//! These tests verify:
//! - Created / Upgraded / Opened outcomes
//! - Opening with an older version is a conflict
//! - A missing store at an equal version raises the version
//! - Stores outside the manifest are not found

use stashkv::database::{Database, DatabaseOptions, OpenOutcome};
use stashkv::engine::EngineOptions;
use stashkv::StashError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn options(version: u32, stores: &[&str]) -> DatabaseOptions {
    DatabaseOptions {
        name: "app".to_string(),
        version,
        stores: stores.iter().map(|s| s.to_string()).collect(),
        engine: EngineOptions::default(),
    }
}

// =============================================================================
// Version Tests
// =============================================================================

#[test]
fn test_first_open_creates() {
    let temp = TempDir::new().unwrap();
    let db = Database::open(temp.path(), options(1, &["entries"])).unwrap();

    assert_eq!(db.outcome(), OpenOutcome::Created);
    assert_eq!(db.name(), "app");
    assert_eq!(db.version(), 1);
    assert_eq!(db.store_names(), &["entries".to_string()]);
    assert!(temp.path().join("app").join("MANIFEST").exists());
}

#[test]
fn test_same_version_opens() {
    let temp = TempDir::new().unwrap();
    Database::open(temp.path(), options(1, &["entries"]))
        .unwrap()
        .close()
        .unwrap();

    let db = Database::open(temp.path(), options(1, &["entries"])).unwrap();
    assert_eq!(db.outcome(), OpenOutcome::Opened);
}

#[test]
fn test_higher_version_upgrades_and_adds_stores() {
    let temp = TempDir::new().unwrap();
    Database::open(temp.path(), options(1, &["entries"]))
        .unwrap()
        .close()
        .unwrap();

    let mut db = Database::open(temp.path(), options(2, &["entries", "extra"])).unwrap();
    assert_eq!(db.outcome(), OpenOutcome::Upgraded { from: 1 });
    assert_eq!(db.version(), 2);
    assert!(db.store("extra").is_ok());
}

#[test]
fn test_lower_version_conflicts() {
    let temp = TempDir::new().unwrap();
    Database::open(temp.path(), options(3, &["entries"]))
        .unwrap()
        .close()
        .unwrap();

    let result = Database::open(temp.path(), options(2, &["entries"]));
    assert!(matches!(
        result,
        Err(StashError::VersionConflict {
            stored: 3,
            requested: 2
        })
    ));
}

// =============================================================================
// Store Tests
// =============================================================================

#[test]
fn test_same_version_missing_store_upgrades() {
    let temp = TempDir::new().unwrap();
    Database::open(temp.path(), options(1, &["entries"]))
        .unwrap()
        .close()
        .unwrap();

    let mut db = Database::open(temp.path(), options(1, &["other"])).unwrap();
    assert_eq!(db.outcome(), OpenOutcome::Upgraded { from: 1 });
    assert_eq!(db.version(), 2);
    assert!(db.store("other").is_ok());
    assert!(db.store("entries").is_ok());
    db.close().unwrap();

    // the raised version is what is on disk now
    assert!(matches!(
        Database::open(temp.path(), options(1, &["entries"])),
        Err(StashError::VersionConflict {
            stored: 2,
            requested: 1
        })
    ));
    let db = Database::open(temp.path(), options(2, &["entries", "other"])).unwrap();
    assert_eq!(db.outcome(), OpenOutcome::Opened);
}

#[test]
fn test_store_not_in_manifest() {
    let temp = TempDir::new().unwrap();
    let mut db = Database::open(temp.path(), options(1, &["entries"])).unwrap();
    assert!(matches!(db.store("other"), Err(StashError::StoreNotFound(_))));
}

#[test]
fn test_store_data_persists_across_opens() {
    let temp = TempDir::new().unwrap();
    {
        let mut db = Database::open(temp.path(), options(1, &["entries"])).unwrap();
        db.store("entries")
            .unwrap()
            .put("k".to_string(), b"v".to_vec())
            .unwrap();
        db.close().unwrap();
    }

    let mut db = Database::open(temp.path(), options(2, &["entries"])).unwrap();
    assert_eq!(db.store("entries").unwrap().get("k"), Some(b"v".to_vec()));
}
