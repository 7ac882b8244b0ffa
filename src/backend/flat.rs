//! Flat file backend
//!
//! A synchronous string → string medium kept in one JSON object file. All
//! stores on the same data directory share it; a key prefix keeps their
//! keys apart.
//!
//! ## Operation
//! ```text
//! lock medium ─► read file ─► change map ─► check quota (set) ─► write tmp ─► rename
//! ```
//! Each call re-reads the file, so changes made through another store on
//! the same medium are visible immediately. The commit listener runs while
//! the medium lock is still held.
//!
//! ## Blocking
//! File access is synchronous and runs on the polling thread. A call holds
//! its worker thread for one small read-modify-write and finishes inside
//! its first poll, which is what keeps same-key calls in poll order.
//! `spawn_blocking` would give that ordering up, and `block_in_place`
//! panics on a current-thread runtime.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::codec::TextCodec;
use crate::error::{Result, StashError};
use crate::value::Value;

use super::{Backend, BackendKind, Change, CommitListener, CommitSlot};

/// File name of the medium inside the data directory
pub const FLAT_STORE_FILE: &str = "flat_store.json";

/// Serializes every read-modify-write of flat media in this process
static MEDIUM_LOCK: Mutex<()> = parking_lot::const_mutex(());

type Medium = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct FlatFileBackend {
    path: PathBuf,
    prefix: String,
    quota: Option<usize>,
    commits: Arc<CommitSlot>,
}

impl FlatFileBackend {
    /// Open the medium under `data_dir`
    ///
    /// Fails if the directory cannot be created or the existing medium is
    /// unreadable.
    pub fn open(data_dir: &Path, prefix: Option<&str>, quota: Option<usize>) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let backend = Self {
            path: data_dir.join(FLAT_STORE_FILE),
            prefix: prefix.unwrap_or_default().to_string(),
            quota,
            commits: Arc::default(),
        };
        {
            let _guard = MEDIUM_LOCK.lock();
            backend.read_medium()?;
        }
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bytes currently used by the whole medium (keys + values)
    pub fn used_bytes(&self) -> Result<usize> {
        let _guard = MEDIUM_LOCK.lock();
        Ok(medium_size(&self.read_medium()?))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Keys of this prefix, with the prefix stripped
    fn own_keys<'a>(&'a self, medium: &'a Medium) -> impl Iterator<Item = &'a str> + 'a {
        medium
            .keys()
            .filter_map(move |full| full.strip_prefix(self.prefix.as_str()))
    }

    fn read_medium(&self) -> Result<Medium> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Medium::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Medium::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            StashError::Storage(format!("Corrupt flat store {}: {}", self.path.display(), e))
        })
    }

    /// Fail if `medium` would not fit the quota
    fn check_quota(&self, medium: &Medium) -> Result<()> {
        if let Some(quota) = self.quota {
            let used = medium_size(medium);
            if used > quota {
                return Err(StashError::QuotaExceeded { used, quota });
            }
        }
        Ok(())
    }

    /// Replace the medium on disk
    fn write_medium(&self, medium: &Medium) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(medium)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn medium_size(medium: &Medium) -> usize {
    medium.iter().map(|(k, v)| k.len() + v.len()).sum()
}

#[async_trait]
impl Backend for FlatFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let medium = {
            let _guard = MEDIUM_LOCK.lock();
            self.read_medium()?
        };
        medium
            .get(&self.full_key(key))
            .map(|text| TextCodec::decode(text))
            .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        // encode before locking; binary values fail here
        let text = TextCodec::encode(&value)?;
        let _guard = MEDIUM_LOCK.lock();
        let mut medium = self.read_medium()?;
        medium.insert(self.full_key(key), text);
        // shrinking operations skip this, so an over-full medium can recover
        self.check_quota(&medium)?;
        self.write_medium(&medium)?;
        self.commits.notify(Change::Set { key, value: &value });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let _guard = MEDIUM_LOCK.lock();
        let mut medium = self.read_medium()?;
        if medium.remove(&self.full_key(key)).is_none() {
            return Ok(false);
        }
        self.write_medium(&medium)?;
        self.commits.notify(Change::Delete { key });
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = MEDIUM_LOCK.lock();
        let mut medium = self.read_medium()?;
        let before = medium.len();
        medium.retain(|full, _| !full.starts_with(self.prefix.as_str()));
        if medium.len() != before {
            self.write_medium(&medium)?;
        }
        self.commits.notify(Change::Clear);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = MEDIUM_LOCK.lock();
        let medium = self.read_medium()?;
        Ok(self.own_keys(&medium).map(str::to_string).collect())
    }

    async fn len(&self) -> Result<usize> {
        let _guard = MEDIUM_LOCK.lock();
        let medium = self.read_medium()?;
        Ok(self.own_keys(&medium).count())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let _guard = MEDIUM_LOCK.lock();
        Ok(self.read_medium()?.contains_key(&self.full_key(key)))
    }

    fn set_commit_listener(&self, listener: Arc<dyn CommitListener>) {
        self.commits.set(listener);
    }
}
