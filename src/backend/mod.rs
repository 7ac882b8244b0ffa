//! Backend Module
//!
//! Persistence backends behind one async capability trait.
//!
//! ## Variants
//! - [`TransactionalBackend`]: WAL-backed object store in a versioned
//!   database, driven by a dedicated worker thread
//! - [`FlatFileBackend`]: one JSON file of string pairs, shared by every
//!   store using the same data directory
//! - [`MemoryBackend`]: process-local map, always available
//!
//! [`select`] picks the first usable variant for a [`Config`](crate::Config).

mod flat;
mod memory;
mod selector;
mod transactional;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StashError};
use crate::value::Value;

pub use flat::{FlatFileBackend, FLAT_STORE_FILE};
pub use memory::MemoryBackend;
pub use selector::{select, Selection, PROBE_KEY};
pub use transactional::TransactionalBackend;

// =============================================================================
// Backend Kind
// =============================================================================

/// The closed set of backend variants, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Transactional,
    Flat,
    Memory,
}

impl BackendKind {
    /// This variant followed by everything it may fall back to
    pub fn fallback_chain(self) -> &'static [BackendKind] {
        match self {
            BackendKind::Transactional => &[
                BackendKind::Transactional,
                BackendKind::Flat,
                BackendKind::Memory,
            ],
            BackendKind::Flat => &[BackendKind::Flat, BackendKind::Memory],
            BackendKind::Memory => &[BackendKind::Memory],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Transactional => "transactional",
            BackendKind::Flat => "flat",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "transactional" | "tx" => Ok(BackendKind::Transactional),
            "flat" => Ok(BackendKind::Flat),
            "memory" | "mem" => Ok(BackendKind::Memory),
            other => Err(StashError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

// =============================================================================
// Backing Store Descriptor
// =============================================================================

/// Describes the backend a store ended up on
///
/// Set once by selection and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackingStore {
    pub kind: BackendKind,
    /// Database name (transactional only)
    pub database: Option<String>,
    /// Object store name (transactional only)
    pub store: Option<String>,
    /// Database version (transactional only)
    pub version: Option<u32>,
    /// Key prefix (flat only)
    pub prefix: Option<String>,
    /// Medium location on disk (persistent backends only)
    pub path: Option<PathBuf>,
    /// Why each preferred backend was skipped, in order
    pub fallback_reasons: Vec<String>,
}

impl BackingStore {
    pub(crate) fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            database: None,
            store: None,
            version: None,
            prefix: None,
            path: None,
            fallback_reasons: Vec::new(),
        }
    }

    /// Whether a preferred backend had to be skipped
    pub fn fell_back(&self) -> bool {
        !self.fallback_reasons.is_empty()
    }
}

// =============================================================================
// Commit Notification
// =============================================================================

/// A mutation a backend has applied
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    /// `value` is the raw stored form (possibly wrapped)
    Set { key: &'a str, value: &'a Value },
    /// Only reported when the key existed
    Delete { key: &'a str },
    Clear,
}

/// Receives every change at the moment it is applied
///
/// Backends call this while still serializing access to their medium, so
/// no read can observe a change before its listener ran. The call happens
/// whether or not the caller is still waiting for the result.
pub trait CommitListener: Send + Sync {
    fn committed(&self, change: Change<'_>);
}

/// Listener slot shared by a backend and whatever applies its writes
#[derive(Default)]
pub(crate) struct CommitSlot {
    listener: RwLock<Option<Arc<dyn CommitListener>>>,
}

impl CommitSlot {
    pub(crate) fn set(&self, listener: Arc<dyn CommitListener>) {
        *self.listener.write() = Some(listener);
    }

    pub(crate) fn notify(&self, change: Change<'_>) {
        if let Some(listener) = self.listener.read().as_ref() {
            listener.committed(change);
        }
    }
}

impl fmt::Debug for CommitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitSlot")
            .field("attached", &self.listener.read().is_some())
            .finish()
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// Async key-value capability shared by every backend
///
/// Values cross this boundary already wrapped for storage; a missing key
/// is `Ok(None)`, never an error. Every applied mutation is reported to the
/// commit listener before any later read can see it. The work of each call
/// starts on the first poll of its future, so calls polled in order apply in
/// order.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Which variant this is
    fn kind(&self) -> BackendKind;

    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Set a value, overwriting any existing one
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key visible to this backend
    async fn clear(&self) -> Result<()>;

    /// List every key visible to this backend
    async fn keys(&self) -> Result<Vec<String>>;

    /// Number of keys visible to this backend
    async fn len(&self) -> Result<usize>;

    /// Check if a key exists
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Release the underlying medium; the next call reopens it
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Report every later mutation to `listener`, replacing any previous one
    fn set_commit_listener(&self, listener: Arc<dyn CommitListener>);
}
