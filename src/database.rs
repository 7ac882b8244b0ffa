//! Database Module
//!
//! A versioned directory of object stores.
//!
//! ## Responsibilities
//! - Compare the requested version with the manifest on disk
//! - Run upgrades: bump the version and create missing object stores
//! - Open store engines on demand and close them together

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::engine::{Engine, EngineOptions};
use crate::error::{Result, StashError};
use crate::storage::Manifest;

/// How to open a database
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Database name (directory under the data dir)
    pub name: String,
    /// Requested version
    pub version: u32,
    /// Object stores created when an upgrade runs
    pub stores: Vec<String>,
    /// Settings of the store engines
    pub engine: EngineOptions,
}

/// Outcome of comparing the requested version with the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The database did not exist and was created
    Created,
    /// The stored version was lower and the database was upgraded
    Upgraded { from: u32 },
    /// Versions matched; nothing changed
    Opened,
}

/// An open database
pub struct Database {
    dir: PathBuf,
    manifest: Manifest,
    engine_options: EngineOptions,
    /// Engines opened so far, by store name
    engines: HashMap<String, Engine>,
    outcome: OpenOutcome,
}

impl Database {
    /// Open a database, upgrading it when the requested version is newer
    ///
    /// - stored version > requested: `VersionConflict`
    /// - no database or stored version < requested: upgrade to the requested
    ///   version, creating every store in `options.stores` that does not
    ///   exist yet
    /// - equal versions with every store present: opened as is
    /// - equal versions with a store missing: upgrade to the stored
    ///   version + 1 so the missing stores get created
    pub fn open(data_dir: &Path, options: DatabaseOptions) -> Result<Self> {
        let dir = data_dir.join(&options.name);
        let stored = Manifest::load(&dir)?;

        let target = match &stored {
            Some(manifest) if manifest.version > options.version => {
                return Err(StashError::VersionConflict {
                    stored: manifest.version,
                    requested: options.version,
                });
            }
            Some(manifest) if manifest.version == options.version => {
                let complete = options.stores.iter().all(|store| manifest.has_store(store));
                if complete {
                    None
                } else {
                    Some(manifest.version + 1)
                }
            }
            _ => Some(options.version),
        };

        let (manifest, outcome) = match (stored, target) {
            (Some(manifest), None) => (manifest, OpenOutcome::Opened),
            (existing, target) => {
                let version = target.unwrap_or(options.version);
                let outcome = match &existing {
                    Some(manifest) => OpenOutcome::Upgraded {
                        from: manifest.version,
                    },
                    None => OpenOutcome::Created,
                };
                let mut manifest = existing.unwrap_or_else(|| Manifest::new(&options.name));
                manifest.version = version;
                for store in &options.stores {
                    if !manifest.has_store(store) {
                        manifest.stores.push(store.clone());
                    }
                }
                manifest.save(&dir)?;

                tracing::info!(
                    database = %options.name,
                    version,
                    stores = ?manifest.stores,
                    ?outcome,
                    "Database upgraded"
                );
                (manifest, outcome)
            }
        };

        Ok(Self {
            dir,
            manifest,
            engine_options: options.engine,
            engines: HashMap::new(),
            outcome,
        })
    }

    /// Engine of an object store, opened on first use
    pub fn store(&mut self, name: &str) -> Result<&mut Engine> {
        if !self.manifest.has_store(name) {
            return Err(StashError::StoreNotFound(name.to_string()));
        }
        if !self.engines.contains_key(name) {
            let engine = Engine::open(&self.dir.join(name), self.engine_options)?;
            self.engines.insert(name.to_string(), engine);
        }
        self.engines
            .get_mut(name)
            .ok_or_else(|| StashError::StoreNotFound(name.to_string()))
    }

    /// Close every open engine
    pub fn close(self) -> Result<()> {
        let mut first_error = None;
        for (name, engine) in self.engines {
            if let Err(e) = engine.close() {
                tracing::warn!(store = %name, error = %e, "Failed to close store");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn name(&self) -> &str {
        &self.manifest.database
    }

    pub fn version(&self) -> u32 {
        self.manifest.version
    }

    pub fn store_names(&self) -> &[String] {
        &self.manifest.stores
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// How the last `open` treated the stored version
    pub fn outcome(&self) -> OpenOutcome {
        self.outcome
    }
}
