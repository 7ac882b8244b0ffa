//! Error types for StashKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using StashError
pub type Result<T> = std::result::Result<T, StashError>;

/// Unified error type for StashKV operations
#[derive(Debug, Error)]
pub enum StashError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage quota exceeded: {used} bytes needed, {quota} allowed")]
    QuotaExceeded { used: usize, quota: usize },

    #[error("Version conflict: database is at version {stored}, requested {requested}")]
    VersionConflict { stored: u32, requested: u32 },

    #[error("Object store '{0}' does not exist in this database version")]
    StoreNotFound(String),

    #[error("Backend connection error: {0}")]
    Connection(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data for key '{key}' does not match the schema")]
    Validation { key: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StashError {
    /// Whether this is a schema validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, StashError::Validation { .. })
    }

    pub(crate) fn validation(key: &str) -> Self {
        StashError::Validation {
            key: key.to_string(),
        }
    }
}

impl From<bincode::Error> for StashError {
    fn from(err: bincode::Error) -> Self {
        StashError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StashError {
    fn from(err: serde_json::Error) -> Self {
        StashError::Serialization(err.to_string())
    }
}
