//! Store Module
//!
//! The storage façade: one async key-value API whatever backend is in use.
//!
//! ## Request Path
//! ```text
//! Store::set ─► key check ─► schema check ─► envelope ─► Backend
//!                                                          │ commit
//!                                                          ▼
//!                                  WatchRegistry ◄─ envelope ◄─ WatchPublisher
//! Store::get ─► key check ─► Backend ─► envelope ─► schema check
//! ```
//!
//! Watches are fed from the backend's commit listener, not from `set`, so
//! a write the caller stopped waiting for is still published.
//!
//! The backend is selected once per store, on the first operation or in
//! [`Store::open`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::backend::{self, Backend, BackendKind, BackingStore, Change, CommitListener, Selection};
use crate::codec::Envelope;
use crate::config::Config;
use crate::error::{Result, StashError};
use crate::schema::{self, Schema};
use crate::value::Value;
use crate::watch::{Join, Watch, WatchRegistry};

/// Async, schema-validated key-value store
///
/// ## Ordering
/// Operations on the same key are applied in the order their futures are
/// first polled. Awaiting each call before the next, or joining them in
/// one task, gives last-write-wins in call order.
pub struct Store {
    config: Config,
    selection: OnceCell<Selection>,
    watches: Arc<WatchRegistry>,
}

impl Store {
    /// Create a store; the backend is selected on first use
    pub fn new(config: Config) -> Self {
        let watches = Arc::new(WatchRegistry::new(config.watch_capacity));
        Self {
            config,
            selection: OnceCell::new(),
            watches,
        }
    }

    /// Create a store and select its backend right away
    pub async fn open(config: Config) -> Result<Self> {
        let store = Self::new(config);
        store.selection().await?;
        Ok(store)
    }

    /// Get a value, validating it against `schema` when given
    ///
    /// A missing key is `Ok(None)` and skips validation.
    pub async fn get(&self, key: &str, schema: Option<&Schema>) -> Result<Option<Value>> {
        let value = self.get_unchecked(key).await?;
        if let (Some(schema), Some(present)) = (schema, &value) {
            if !schema::validate(present, schema) {
                return Err(StashError::validation(key));
            }
        }
        Ok(value)
    }

    /// Get a value without validation
    pub async fn get_unchecked(&self, key: &str) -> Result<Option<Value>> {
        check_key(key)?;
        let selection = self.selection().await?;
        let raw = selection.backend.get(key).await?;
        Ok(raw.map(|raw| self.envelope(selection).unwrap(raw)))
    }

    /// Set a value, validating it against `schema` first
    ///
    /// Setting `Value::Null` deletes the key. A value failing the schema
    /// is never written.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Value>,
        schema: Option<&Schema>,
    ) -> Result<()> {
        let value = value.into();
        if value.is_null() {
            return self.delete(key).await;
        }
        check_key(key)?;
        if let Some(schema) = schema {
            if !schema::validate(&value, schema) {
                tracing::debug!(key, kind = value.kind_name(), "Value rejected by schema");
                return Err(StashError::validation(key));
            }
        }

        let selection = self.selection().await?;
        let raw = self.envelope(selection).wrap(value);
        selection.backend.set(key, raw).await?;
        tracing::trace!(key, backend = %selection.descriptor.kind, "Value stored");
        Ok(())
    }

    /// Delete a key; deleting a missing key succeeds
    pub async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let selection = self.selection().await?;
        selection.backend.delete(key).await?;
        Ok(())
    }

    /// Delete every key
    pub async fn clear(&self) -> Result<()> {
        let selection = self.selection().await?;
        selection.backend.clear().await
    }

    pub async fn has(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        let selection = self.selection().await?;
        selection.backend.contains(key).await
    }

    /// Keys present right now
    pub async fn keys(&self) -> Result<Keys> {
        let selection = self.selection().await?;
        let keys = selection.backend.keys().await?;
        Ok(Keys {
            inner: keys.into_iter(),
        })
    }

    /// Number of keys, counted on every call
    pub async fn size(&self) -> Result<usize> {
        let selection = self.selection().await?;
        selection.backend.len().await
    }

    /// Watch a key: its current value first, then every change
    pub async fn watch(&self, key: &str, schema: Option<Schema>) -> Result<Watch> {
        check_key(key)?;
        let selection = self.selection().await?;

        let (receiver, join) = self.watches.join(key);
        let initial = match join {
            Join::Replay(value) => Some(value),
            Join::Load(generation) => {
                let loaded = match selection.backend.get(key).await {
                    Ok(raw) => raw.map(|raw| self.envelope(selection).unwrap(raw)),
                    Err(e) => {
                        drop(receiver);
                        self.watches.release(key);
                        return Err(e);
                    }
                };
                // a change committed meanwhile was published and is queued
                self.watches
                    .seed(key, generation, &loaded)
                    .then_some(loaded)
            }
        };

        Ok(Watch::new(
            key,
            schema,
            Arc::clone(&self.watches),
            receiver,
            initial,
        ))
    }

    // =========================================================================
    // Typed Access
    // =========================================================================

    /// Get a value deserialized into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get_unchecked(key).await? else {
            return Ok(None);
        };
        let json = serde_json::Value::try_from(value)?;
        Ok(Some(serde_json::from_value(json)?))
    }

    /// Store any serializable value
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)?;
        self.set(key, Value::from(json), None).await
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Descriptor of the selected backend
    pub async fn backing_store(&self) -> Result<BackingStore> {
        Ok(self.selection().await?.descriptor.clone())
    }

    /// Kind of the selected backend
    pub async fn backend_kind(&self) -> Result<BackendKind> {
        Ok(self.selection().await?.descriptor.kind)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Watch registry of this store
    pub fn watches(&self) -> &WatchRegistry {
        &self.watches
    }

    /// Release the backend medium; later calls reopen it
    pub async fn close(&self) -> Result<()> {
        match self.selection.get() {
            Some(selection) => selection.backend.close().await,
            None => Ok(()),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    async fn selection(&self) -> Result<&Selection> {
        self.selection
            .get_or_try_init(|| async {
                let selection = backend::select(&self.config).await?;
                self.attach(&selection);
                Ok::<_, StashError>(selection)
            })
            .await
    }

    /// Feed the backend's commits into the watch registry
    fn attach(&self, selection: &Selection) {
        selection.backend.set_commit_listener(Arc::new(WatchPublisher {
            registry: Arc::clone(&self.watches),
            envelope: self.envelope(selection),
        }));
    }

    fn envelope(&self, selection: &Selection) -> Envelope {
        Envelope::new(
            self.config.wrap_values && selection.descriptor.kind == BackendKind::Transactional,
        )
    }
}

/// Publishes committed changes, unwrapped, to a store's watches
struct WatchPublisher {
    registry: Arc<WatchRegistry>,
    envelope: Envelope,
}

impl CommitListener for WatchPublisher {
    fn committed(&self, change: Change<'_>) {
        match change {
            Change::Set { key, value } => {
                self.registry
                    .publish(key, Some(self.envelope.unwrap(value.clone())));
            }
            Change::Delete { key } => {
                self.registry.publish(key, None);
            }
            Change::Clear => self.registry.publish_clear(),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("selection", &self.selection.get())
            .finish()
    }
}

/// Wrap an already selected backend (mainly for tests and embedding)
impl From<(Config, Arc<dyn Backend>)> for Store {
    fn from((config, backend): (Config, Arc<dyn Backend>)) -> Self {
        let store = Store::new(config);
        let selection = Selection {
            descriptor: BackingStore::new(backend.kind()),
            backend,
        };
        store.attach(&selection);
        // a fresh cell cannot already be set
        let _ = store.selection.set(selection);
        store
    }
}

/// Finite iterator over the keys present when [`Store::keys`] was called
#[derive(Debug)]
pub struct Keys {
    inner: std::vec::IntoIter<String>,
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys {}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StashError::InvalidKey("key must not be empty".into()));
    }
    Ok(())
}
