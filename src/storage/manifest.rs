//! Database manifest
//!
//! Records the schema version of a database and the object stores it holds.
//! Stored as JSON in `{database_dir}/MANIFEST` and replaced atomically.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StashError};

const MANIFEST_FILE: &str = "MANIFEST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Database name
    pub database: String,
    /// Current schema version
    pub version: u32,
    /// Object stores created so far, in creation order
    pub stores: Vec<String>,
}

impl Manifest {
    /// A manifest for a database that has never been opened
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            version: 0,
            stores: Vec::new(),
        }
    }

    pub fn path(database_dir: &Path) -> PathBuf {
        database_dir.join(MANIFEST_FILE)
    }

    /// Read the manifest, `None` when the database does not exist yet
    pub fn load(database_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(database_dir);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest = serde_json::from_str(&text).map_err(|e| {
            StashError::Storage(format!("Corrupt manifest {}: {}", path.display(), e))
        })?;
        Ok(Some(manifest))
    }

    /// Write the manifest through a temp file and rename
    pub fn save(&self, database_dir: &Path) -> Result<()> {
        fs::create_dir_all(database_dir)?;
        let path = Self::path(database_dir);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn has_store(&self, store: &str) -> bool {
        self.stores.iter().any(|s| s == store)
    }
}
