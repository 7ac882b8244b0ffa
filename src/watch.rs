//! Watch Module
//!
//! Per-key change notification.
//!
//! ## Channel Lifecycle
//! ```text
//! first watch(k) ──► channel created, current value loaded and emitted
//! watch(k) again ──► joins channel, last known value replayed
//! commit of k    ──► last value updated, change broadcast
//! last Watch drop ─► channel removed
//! ```
//!
//! Publishes come from the backend while it still holds its medium, so a
//! load either sees a change that was already published or runs before
//! it. A change racing the first subscription is delivered exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::{Result, StashError};
use crate::schema::{self, Schema};
use crate::value::Value;

/// Channel state of one watched key
struct Channel {
    sender: broadcast::Sender<Option<Value>>,
    /// Last value seen on this key; `None` until loaded or published
    last: Option<Option<Value>>,
    /// Bumped on every publish
    generation: u64,
}

/// Registry of per-key channels, shared by a store and its watches
pub struct WatchRegistry {
    channels: Mutex<HashMap<String, Channel>>,
    capacity: usize,
}

/// What a new subscriber starts from
pub(crate) enum Join {
    /// The channel knows the current value
    Replay(Option<Value>),
    /// The value must be loaded; pass the generation to [`WatchRegistry::seed`]
    Load(u64),
}

impl WatchRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Publish a change of `key` to its watchers, if any
    ///
    /// Returns the number of receivers reached.
    pub fn publish(&self, key: &str, value: Option<Value>) -> usize {
        let mut channels = self.channels.lock();
        let Some(channel) = channels.get_mut(key) else {
            return 0;
        };
        channel.last = Some(value.clone());
        channel.generation += 1;
        let reached = channel.sender.send(value).unwrap_or(0);
        tracing::trace!(key, reached, "Watch change published");
        reached
    }

    /// Publish "absent" to every watched key
    pub fn publish_clear(&self) {
        let mut channels = self.channels.lock();
        for channel in channels.values_mut() {
            channel.last = Some(None);
            channel.generation += 1;
            let _ = channel.sender.send(None);
        }
        tracing::trace!(channels = channels.len(), "Watch clear published");
    }

    /// Number of keys currently watched
    pub fn watched_keys(&self) -> usize {
        self.channels.lock().len()
    }

    /// Number of live watches on `key`
    pub fn watcher_count(&self, key: &str) -> usize {
        self.channels
            .lock()
            .get(key)
            .map_or(0, |channel| channel.sender.receiver_count())
    }

    /// Register a receiver on `key`, creating the channel if needed
    pub(crate) fn join(&self, key: &str) -> (broadcast::Receiver<Option<Value>>, Join) {
        let mut channels = self.channels.lock();
        let channel = channels.entry(key.to_string()).or_insert_with(|| Channel {
            sender: broadcast::channel(self.capacity).0,
            last: None,
            generation: 0,
        });
        let receiver = channel.sender.subscribe();
        let join = match &channel.last {
            Some(value) => Join::Replay(value.clone()),
            None => Join::Load(channel.generation),
        };
        (receiver, join)
    }

    /// Record a loaded value unless a publish happened since `generation`
    ///
    /// Returns whether the loaded value is current and should be emitted.
    pub(crate) fn seed(&self, key: &str, generation: u64, value: &Option<Value>) -> bool {
        let mut channels = self.channels.lock();
        match channels.get_mut(key) {
            Some(channel) if channel.generation == generation => {
                if channel.last.is_none() {
                    channel.last = Some(value.clone());
                }
                true
            }
            _ => false,
        }
    }

    /// Drop the channel of `key` once nobody listens
    pub(crate) fn release(&self, key: &str) {
        let mut channels = self.channels.lock();
        if channels
            .get(key)
            .is_some_and(|channel| channel.sender.receiver_count() == 0)
        {
            channels.remove(key);
            tracing::trace!(key, "Watch channel removed");
        }
    }
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watched_keys", &self.watched_keys())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Subscription to the values of one key
///
/// Yields the current value first, then one item per change. It only ends
/// after a value fails the schema.
pub struct Watch {
    key: String,
    schema: Option<Schema>,
    registry: Arc<WatchRegistry>,
    receiver: Option<broadcast::Receiver<Option<Value>>>,
    /// Value to emit before anything from the channel
    initial: Option<Option<Value>>,
    finished: bool,
}

impl Watch {
    pub(crate) fn new(
        key: &str,
        schema: Option<Schema>,
        registry: Arc<WatchRegistry>,
        receiver: broadcast::Receiver<Option<Value>>,
        initial: Option<Option<Value>>,
    ) -> Self {
        Self {
            key: key.to_string(),
            schema,
            registry,
            receiver: Some(receiver),
            initial,
            finished: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next value of the key
    ///
    /// `Some(Ok(None))` means the key is absent. `None` means the watch
    /// has ended.
    pub async fn recv(&mut self) -> Option<Result<Option<Value>>> {
        if self.finished {
            return None;
        }
        if let Some(value) = self.initial.take() {
            return Some(self.check(value));
        }

        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(value) => return Some(self.check(value)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(key = %self.key, skipped, "Watch lagged, changes dropped");
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Turn the watch into a [`Stream`]
    pub fn into_stream(mut self) -> impl Stream<Item = Result<Option<Value>>> + Send {
        async_stream::stream! {
            while let Some(item) = self.recv().await {
                yield item;
            }
        }
    }

    fn check(&mut self, value: Option<Value>) -> Result<Option<Value>> {
        if let (Some(schema), Some(present)) = (&self.schema, &value) {
            if !schema::validate(present, schema) {
                self.finished = true;
                return Err(StashError::validation(&self.key));
            }
        }
        Ok(value)
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        // the receiver must be gone before the count is checked
        drop(self.receiver.take());
        self.registry.release(&self.key);
    }
}

impl std::fmt::Debug for Watch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch")
            .field("key", &self.key)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
