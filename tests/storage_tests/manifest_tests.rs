//! Tests for the database manifest
//!
//! These tests verify:
//! - A missing manifest loads as `None`
//! - Save then load returns the same manifest
//! - A corrupt manifest is a storage error

use std::fs;

use stashkv::storage::Manifest;
use stashkv::StashError;
use tempfile::TempDir;

#[test]
fn test_missing_manifest() {
    let temp = TempDir::new().unwrap();
    assert_eq!(Manifest::load(temp.path()).unwrap(), None);
}

#[test]
fn test_save_and_load() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("db");

    let mut manifest = Manifest::new("db");
    manifest.version = 3;
    manifest.stores.push("entries".to_string());
    manifest.save(&dir).unwrap();

    let loaded = Manifest::load(&dir).unwrap().unwrap();
    assert_eq!(loaded, manifest);
    assert!(loaded.has_store("entries"));
    assert!(!loaded.has_store("other"));
}

#[test]
fn test_manifest_is_readable_json() {
    let temp = TempDir::new().unwrap();
    let mut manifest = Manifest::new("db");
    manifest.version = 1;
    manifest.save(temp.path()).unwrap();

    let text = fs::read_to_string(Manifest::path(temp.path())).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["database"], "db");
    assert_eq!(json["version"], 1);
}

#[test]
fn test_corrupt_manifest() {
    let temp = TempDir::new().unwrap();
    fs::write(Manifest::path(temp.path()), "not json").unwrap();

    assert!(matches!(
        Manifest::load(temp.path()),
        Err(StashError::Storage(_))
    ));
}
