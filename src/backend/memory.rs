//! In-memory backend
//!
//! Volatile and process-local; always available, so it ends every
//! fallback chain.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::value::Value;

use super::{Backend, BackendKind, Change, CommitListener, CommitSlot};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Value>>,
    commits: CommitSlot,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        // notify under the write lock so no reader sees the value first
        let mut data = self.data.write();
        self.commits.notify(Change::Set { key, value: &value });
        data.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut data = self.data.write();
        let existed = data.remove(key).is_some();
        if existed {
            self.commits.notify(Change::Delete { key });
        }
        Ok(existed)
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.data.write();
        data.clear();
        self.commits.notify(Change::Clear);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.data.read().len())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.data.read().contains_key(key))
    }

    fn set_commit_listener(&self, listener: Arc<dyn CommitListener>) {
        self.commits.set(listener);
    }
}
