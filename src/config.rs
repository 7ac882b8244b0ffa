//! Configuration for StashKV
//!
//! Centralized configuration with sensible defaults. Each option only
//! affects the backend it names.

use std::path::PathBuf;
use std::time::Duration;

use crate::backend::BackendKind;
use crate::error::{Result, StashError};

/// Default database (directory) name for the transactional backend
pub const DEFAULT_DATABASE_NAME: &str = "stashkv";

/// Default object store name inside the database
pub const DEFAULT_STORE_NAME: &str = "entries";

/// Default database version
pub const DEFAULT_STORE_VERSION: u32 = 1;

/// Main configuration for a StashKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // General
    // -------------------------------------------------------------------------
    /// Root directory for all persisted data
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── flat_store.json          (flat backend medium)
    ///     └── {database}/
    ///           ├── MANIFEST           (version + object stores)
    ///           └── {store}/
    ///                 ├── wal.log
    ///                 └── snapshots/
    pub data_dir: PathBuf,

    /// First backend to try; selection falls back from there
    pub backend: BackendKind,

    // -------------------------------------------------------------------------
    // Transactional Backend
    // -------------------------------------------------------------------------
    /// Database name (directory under data_dir)
    pub database_name: String,

    /// Object store name inside the database
    pub store_name: String,

    /// Database version; a higher version than on disk triggers an upgrade
    pub store_version: u32,

    /// Wrap every stored value in a `{ "value": V }` envelope
    pub wrap_values: bool,

    /// Sync strategy: how often to fsync the WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Number of WAL entries after which the store is checkpointed
    pub checkpoint_threshold: usize,

    /// Upper bound for the open + round-trip probe
    pub probe_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Flat Backend
    // -------------------------------------------------------------------------
    /// Prefix prepended to every key in the shared flat medium
    pub key_prefix: Option<String>,

    /// Maximum size of the flat medium (bytes of keys + values)
    pub flat_quota_bytes: Option<usize>,

    // -------------------------------------------------------------------------
    // Watch Configuration
    // -------------------------------------------------------------------------
    /// Buffered changes per watched key before slow subscribers lag
    pub watch_capacity: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stashkv_data"),
            backend: BackendKind::Transactional,
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            store_version: DEFAULT_STORE_VERSION,
            wrap_values: false,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            checkpoint_threshold: 1000,
            probe_timeout_ms: 5000,
            key_prefix: None,
            flat_quota_bytes: Some(5 * 1024 * 1024), // 5 MiB
            watch_capacity: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Probe timeout as a Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Check option values that would make every backend misbehave
    pub fn validate(&self) -> Result<()> {
        if self.database_name.trim().is_empty() {
            return Err(StashError::Config("database name must not be empty".into()));
        }
        if self.store_name.trim().is_empty() {
            return Err(StashError::Config("store name must not be empty".into()));
        }
        if self.store_version == 0 {
            return Err(StashError::Config("store version must be at least 1".into()));
        }
        if self.watch_capacity == 0 {
            return Err(StashError::Config("watch capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the first backend to try
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    /// Set the database name
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.config.database_name = name.into();
        self
    }

    /// Set the object store name
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.config.store_name = name.into();
        self
    }

    /// Set the database version
    pub fn store_version(mut self, version: u32) -> Self {
        self.config.store_version = version;
        self
    }

    /// Wrap values in an envelope in the transactional backend
    pub fn wrap_values(mut self, wrap: bool) -> Self {
        self.config.wrap_values = wrap;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the number of WAL entries between checkpoints
    pub fn checkpoint_threshold(mut self, entries: usize) -> Self {
        self.config.checkpoint_threshold = entries;
        self
    }

    /// Set the probe timeout (in milliseconds)
    pub fn probe_timeout_ms(mut self, ms: u64) -> Self {
        self.config.probe_timeout_ms = ms;
        self
    }

    /// Set the flat backend key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = Some(prefix.into());
        self
    }

    /// Set (or remove) the flat backend quota
    pub fn flat_quota_bytes(mut self, quota: Option<usize>) -> Self {
        self.config.flat_quota_bytes = quota;
        self
    }

    /// Set the per-key watch buffer
    pub fn watch_capacity(mut self, capacity: usize) -> Self {
        self.config.watch_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
