//! # StashKV
//!
//! Async, schema-validated key-value storage with:
//! - One API over three backends, chosen at runtime with fallback
//! - A durable transactional backend (WAL, snapshots, versioned databases)
//! - A flat JSON file backend shared between key prefixes
//! - A volatile in-memory backend
//! - Structural schema validation on reads and writes
//! - Per-key watch streams
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │        (key check, schema validation, envelope)             │
//! └──────────────┬──────────────────────────────────────────────┘
//!                │
//!                ▼
//!   ┌──────────────────────┐  commit  ┌──────────────────┐
//!   │  Backend (selected)  │ ───────► │  WatchRegistry   │
//!   └──────────┬───────────┘          │ (per-key bcast)  │
//!              │                      └──────────────────┘
//!    ┌─────────┼──────────────────┐
//!    ▼         ▼                  ▼
//! ┌────────┐ ┌──────────────┐ ┌──────────────────────────┐
//! │ Memory │ │  Flat (JSON) │ │ Transactional (worker)   │
//! └────────┘ └──────────────┘ │  Database ─► Engine      │
//!                             │   WAL + MemTable +       │
//!                             │   Snapshots              │
//!                             └──────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use stashkv::{Config, Schema, Store};
//!
//! # async fn demo() -> stashkv::Result<()> {
//! let store = Store::open(Config::builder().data_dir("./data").build()).await?;
//! let age = Schema::integer().minimum(0.0);
//! store.set("age", 42, Some(&age)).await?;
//! assert_eq!(store.get("age", Some(&age)).await?, Some(42.into()));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod value;
pub mod schema;
pub mod codec;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;
pub mod database;

pub mod backend;
pub mod store;
pub mod watch;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{Backend, BackendKind, BackingStore};
pub use config::{Config, ConfigBuilder, WalSyncStrategy};
pub use error::{Result, StashError};
pub use schema::{validate, Schema};
pub use store::{Keys, Store};
pub use value::Value;
pub use watch::Watch;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StashKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
