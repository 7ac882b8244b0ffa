//! Transactional backend
//!
//! A versioned [`Database`] driven by a dedicated worker thread.
//!
//! ## Request Flow
//! ```text
//!  caller future ──(first poll)──► crossbeam queue ──► worker thread
//!        ▲                                                 │
//!        └────────────── tokio oneshot reply ◄─────────────┘
//! ```
//! The worker owns the database handle and applies requests strictly in
//! queue order, so two writes polled in order land in order. It opens the
//! database on its first request; `close` stops it and the next request
//! starts a fresh worker.
//!
//! Changes are reported to the commit listener by the worker itself, right
//! after they are applied and before the next request runs. A caller that
//! drops its future after the request was queued cannot skip the report.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::Config;
use crate::database::{Database, DatabaseOptions};
use crate::engine::EngineOptions;
use crate::error::{Result, StashError};
use crate::value::Value;

use super::{Backend, BackendKind, Change, CommitListener, CommitSlot};

// =============================================================================
// Worker Protocol
// =============================================================================

#[derive(Debug)]
enum Op {
    /// Open the database if needed
    Connect,
    Get(String),
    /// Key, value and its bincode encoding
    Put(String, Value, Vec<u8>),
    Delete(String),
    Clear,
    Keys,
    Len,
    Contains(String),
    /// Close the database and stop the worker
    Close,
}

#[derive(Debug)]
enum Reply {
    Done,
    /// Version the database is open at
    Version(u32),
    Value(Option<Vec<u8>>),
    Flag(bool),
    Keys(Vec<String>),
    Count(usize),
}

struct Request {
    op: Op,
    reply: oneshot::Sender<Result<Reply>>,
}

/// Handle to a running worker
struct Worker {
    sender: Sender<Request>,
}

/// State shared between the backend and its workers
#[derive(Debug, Default)]
struct Shared {
    commits: CommitSlot,
    /// Version of the last successful open; 0 before that
    opened_version: AtomicU32,
}

// =============================================================================
// Backend
// =============================================================================

pub struct TransactionalBackend {
    data_dir: PathBuf,
    options: DatabaseOptions,
    store: String,
    worker: Mutex<Option<Worker>>,
    shared: Arc<Shared>,
}

impl TransactionalBackend {
    /// Describe the backend; nothing is opened until the first request
    pub fn new(config: &Config) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            options: DatabaseOptions {
                name: config.database_name.clone(),
                version: config.store_version,
                stores: vec![config.store_name.clone()],
                engine: EngineOptions::from(config),
            },
            store: config.store_name.clone(),
            worker: Mutex::new(None),
            shared: Arc::default(),
        }
    }

    /// Open the database now, surfacing version and store errors
    ///
    /// Returns the version the database is open at, which is above the
    /// configured one when opening had to add the store.
    pub async fn connect(&self) -> Result<u32> {
        match self.call(Op::Connect).await? {
            Reply::Version(version) => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.options.name
    }

    pub fn store_name(&self) -> &str {
        &self.store
    }

    /// Version of the open database, or the configured one before opening
    pub fn version(&self) -> u32 {
        match self.shared.opened_version.load(Ordering::Acquire) {
            0 => self.options.version,
            opened => opened,
        }
    }

    /// Directory of the database
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.options.name)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Queue a request, starting a worker if none is running
    fn enqueue(&self, op: Op) -> Result<oneshot::Receiver<Result<Reply>>> {
        let (reply, receiver) = oneshot::channel();
        let mut request = Request { op, reply };

        let mut worker = self.worker.lock();
        // one retry covers a worker that exited after `close` or a panic
        for _ in 0..2 {
            let sender = match worker.as_ref() {
                Some(running) => running.sender.clone(),
                None => {
                    let spawned = self.spawn_worker()?;
                    let sender = spawned.sender.clone();
                    *worker = Some(spawned);
                    sender
                }
            };
            match sender.send(request) {
                Ok(()) => return Ok(receiver),
                Err(channel::SendError(returned)) => {
                    request = returned;
                    *worker = None;
                }
            }
        }
        Err(StashError::Connection("transaction worker is not accepting requests".into()))
    }

    fn spawn_worker(&self) -> Result<Worker> {
        let (sender, receiver) = channel::unbounded();
        let data_dir = self.data_dir.clone();
        let mut options = self.options.clone();
        // reopen at the version an earlier worker upgraded to
        options.version = self.version();
        let store = self.store.clone();
        let shared = Arc::clone(&self.shared);

        thread::Builder::new()
            .name(format!("stashkv-tx-{}", self.options.name))
            .spawn(move || run_worker(&data_dir, options, &store, &shared, receiver))?;

        tracing::debug!(database = %self.options.name, "Transaction worker started");
        Ok(Worker { sender })
    }

    async fn call(&self, op: Op) -> Result<Reply> {
        let receiver = self.enqueue(op)?;
        receiver
            .await
            .map_err(|_| StashError::Connection("transaction worker stopped".into()))?
    }
}

#[async_trait]
impl Backend for TransactionalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Transactional
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.call(Op::Get(key.to_string())).await? {
            Reply::Value(Some(bytes)) => Ok(Some(bincode::deserialize(&bytes)?)),
            Reply::Value(None) => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let bytes = bincode::serialize(&value)?;
        match self.call(Op::Put(key.to_string(), value, bytes)).await? {
            Reply::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match self.call(Op::Delete(key.to_string())).await? {
            Reply::Flag(existed) => Ok(existed),
            other => Err(unexpected(other)),
        }
    }

    async fn clear(&self) -> Result<()> {
        match self.call(Op::Clear).await? {
            Reply::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        match self.call(Op::Keys).await? {
            Reply::Keys(keys) => Ok(keys),
            other => Err(unexpected(other)),
        }
    }

    async fn len(&self) -> Result<usize> {
        match self.call(Op::Len).await? {
            Reply::Count(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        match self.call(Op::Contains(key.to_string())).await? {
            Reply::Flag(found) => Ok(found),
            other => Err(unexpected(other)),
        }
    }

    async fn close(&self) -> Result<()> {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return Ok(());
        };
        let (reply, receiver) = oneshot::channel();
        if worker.sender.send(Request { op: Op::Close, reply }).is_err() {
            // worker already gone
            return Ok(());
        }
        drop(worker);
        match receiver.await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Ok(()),
        }
    }

    fn set_commit_listener(&self, listener: Arc<dyn CommitListener>) {
        self.shared.commits.set(listener);
    }
}

fn unexpected(reply: Reply) -> StashError {
    StashError::Connection(format!("unexpected worker reply: {:?}", reply))
}

// =============================================================================
// Worker Loop
// =============================================================================

/// Apply requests in order until `Close` or until every sender is gone
fn run_worker(
    data_dir: &Path,
    options: DatabaseOptions,
    store: &str,
    shared: &Shared,
    requests: Receiver<Request>,
) {
    let mut database: Option<Database> = None;

    while let Ok(Request { op, reply }) = requests.recv() {
        if let Op::Close = op {
            let result = database.take().map_or(Ok(()), Database::close);
            let _ = reply.send(result.map(|_| Reply::Done));
            tracing::debug!(database = %options.name, "Transaction worker closed");
            return;
        }

        let result = open_database(&mut database, data_dir, &options, store, shared)
            .and_then(|db| apply(db, store, op, &shared.commits));
        if let Err(e) = &result {
            tracing::debug!(database = %options.name, error = %e, "Request failed");
        }
        // the caller may have given up; nothing to do then
        let _ = reply.send(result);
    }

    if let Some(db) = database {
        if let Err(e) = db.close() {
            tracing::warn!(error = %e, "Failed to close database after last handle dropped");
        }
    }
}

/// The open database, opening it on first use
fn open_database<'a>(
    slot: &'a mut Option<Database>,
    data_dir: &Path,
    options: &DatabaseOptions,
    store: &str,
    shared: &Shared,
) -> Result<&'a mut Database> {
    if slot.is_none() {
        let mut db = Database::open(data_dir, options.clone())?;
        // fail fast when this version lacks the store
        db.store(store)?;
        shared.opened_version.store(db.version(), Ordering::Release);
        *slot = Some(db);
    }
    slot.as_mut()
        .ok_or_else(|| StashError::Connection("database not open".into()))
}

fn apply(db: &mut Database, store: &str, op: Op, commits: &CommitSlot) -> Result<Reply> {
    let version = db.version();
    let engine = db.store(store)?;
    let reply = match op {
        Op::Connect => Reply::Version(version),
        Op::Get(key) => Reply::Value(engine.get(&key)),
        Op::Put(key, value, bytes) => {
            engine.put(key.clone(), bytes)?;
            commits.notify(Change::Set {
                key: &key,
                value: &value,
            });
            Reply::Done
        }
        Op::Delete(key) => {
            let existed = engine.delete(&key)?;
            if existed {
                commits.notify(Change::Delete { key: &key });
            }
            Reply::Flag(existed)
        }
        Op::Clear => {
            engine.clear()?;
            commits.notify(Change::Clear);
            Reply::Done
        }
        Op::Keys => Reply::Keys(engine.keys()),
        Op::Len => Reply::Count(engine.len()),
        Op::Contains(key) => Reply::Flag(engine.contains(&key)),
        Op::Close => Reply::Done,
    };
    Ok(reply)
}
