//! Backend selection
//!
//! Walks the fallback chain starting at `Config::backend` and keeps the
//! first backend that survives a probe round-trip:
//!
//! ```text
//! Transactional ──fail──► Flat ──fail──► Memory
//!   open + probe           open + probe   (always works)
//! ```
//!
//! Every skipped backend is logged and recorded in the resulting
//! [`BackingStore`].

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, StashError};
use crate::value::Value;

use super::{
    Backend, BackendKind, BackingStore, FlatFileBackend, MemoryBackend, TransactionalBackend,
};

/// Key written and removed again by the probe
pub const PROBE_KEY: &str = "__stashkv_probe__";

/// The chosen backend and its descriptor
#[derive(Clone)]
pub struct Selection {
    pub backend: Arc<dyn Backend>,
    pub descriptor: BackingStore,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Pick the first usable backend for `config`
pub async fn select(config: &Config) -> Result<Selection> {
    config.validate()?;

    let mut fallback_reasons = Vec::new();
    for &kind in config.backend.fallback_chain() {
        match try_backend(kind, config).await {
            Ok((backend, mut descriptor)) => {
                descriptor.fallback_reasons = fallback_reasons;
                tracing::info!(
                    backend = %kind,
                    fallbacks = descriptor.fallback_reasons.len(),
                    "Storage backend selected"
                );
                return Ok(Selection {
                    backend,
                    descriptor,
                });
            }
            Err(e) => {
                tracing::warn!(backend = %kind, error = %e, "Storage backend unavailable, falling back");
                fallback_reasons.push(format!("{}: {}", kind, e));
            }
        }
    }

    // the chain always ends with memory, which cannot fail
    Err(StashError::BackendUnavailable(fallback_reasons.join("; ")))
}

async fn try_backend(kind: BackendKind, config: &Config) -> Result<(Arc<dyn Backend>, BackingStore)> {
    match kind {
        BackendKind::Transactional => {
            let backend = TransactionalBackend::new(config);
            let opened = tokio::time::timeout(config.probe_timeout(), async {
                let version = backend.connect().await?;
                probe(&backend).await?;
                Ok::<_, StashError>(version)
            })
            .await;
            let version = match flatten_timeout(opened) {
                Ok(version) => version,
                Err(e) => {
                    // do not leave a worker holding the database open
                    let _ = backend.close().await;
                    return Err(e);
                }
            };
            if version != config.store_version {
                tracing::info!(
                    requested = config.store_version,
                    opened = version,
                    "Database version raised to add the store"
                );
            }

            let mut descriptor = BackingStore::new(kind);
            descriptor.database = Some(backend.database_name().to_string());
            descriptor.store = Some(backend.store_name().to_string());
            descriptor.version = Some(version);
            descriptor.path = Some(backend.path());
            Ok((Arc::new(backend), descriptor))
        }
        BackendKind::Flat => {
            let backend = FlatFileBackend::open(
                &config.data_dir,
                config.key_prefix.as_deref(),
                config.flat_quota_bytes,
            )?;
            flatten_timeout(tokio::time::timeout(config.probe_timeout(), probe(&backend)).await)?;

            let mut descriptor = BackingStore::new(kind);
            descriptor.prefix = config.key_prefix.clone();
            descriptor.path = Some(backend.path().to_path_buf());
            Ok((Arc::new(backend), descriptor))
        }
        BackendKind::Memory => Ok((Arc::new(MemoryBackend::new()), BackingStore::new(kind))),
    }
}

/// Write, read back, compare and remove the probe key
async fn probe(backend: &dyn Backend) -> Result<()> {
    let sample = Value::from("probe");
    backend.set(PROBE_KEY, sample.clone()).await?;
    let read = backend.get(PROBE_KEY).await?;
    backend.delete(PROBE_KEY).await?;

    if read.as_ref() != Some(&sample) {
        return Err(StashError::BackendUnavailable(format!(
            "{} probe read back {:?}",
            backend.kind(),
            read
        )));
    }
    Ok(())
}

fn flatten_timeout<T>(
    result: std::result::Result<Result<T>, tokio::time::error::Elapsed>,
) -> Result<T> {
    result.map_err(|_| StashError::BackendUnavailable("probe timed out".into()))?
}
