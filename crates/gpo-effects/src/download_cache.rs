//! Per-object download cache
//!
//! Each fetch downloads the object again; the directory is the authority on
//! freshness. A successful download atomically replaces
//! `<cache_dir>/sysvol/<id>.gpo`. Concurrent fetches of the same object id
//! with the same ticket share one download.

use crate::atomic::write_atomic;
use crate::singleflight::Singleflight;
use gpo_core::{
    PolicyError, PolicyObjectRef, RawPolicyObject, Result, TransportEffects, TransportError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

const SYSVOL_DIR: &str = "sysvol";
const OBJECT_EXTENSION: &str = "gpo";

/// Downloads policy objects and keeps the last copy of each
pub struct DownloadCache {
    dir: PathBuf,
    transport: Arc<dyn TransportEffects>,
    timeout: Duration,
    in_flight: Singleflight<(String, PathBuf), Result<RawPolicyObject>>,
}

impl DownloadCache {
    /// Create a cache under `<cache_dir>/sysvol`
    pub fn new(cache_dir: &Path, transport: Arc<dyn TransportEffects>, timeout: Duration) -> Self {
        Self {
            dir: cache_dir.join(SYSVOL_DIR),
            transport,
            timeout,
            in_flight: Singleflight::new(),
        }
    }

    /// File holding the cached copy of `id`
    pub fn cached_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{OBJECT_EXTENSION}"))
    }

    /// Download `object` and replace its cached copy.
    ///
    /// Concurrent fetches of the same object with the same ticket share one
    /// download, bounded by the configured timeout only. Each caller gives
    /// up at its own `deadline` without cancelling the shared download for
    /// the others.
    #[instrument(skip_all, fields(gpo_id = %object.id))]
    pub async fn fetch(
        &self,
        object: &PolicyObjectRef,
        ticket: &Path,
        deadline: Option<Instant>,
    ) -> Result<RawPolicyObject> {
        let key = (object.id.clone(), ticket.to_path_buf());
        let shared = self.in_flight.run(key, || self.download(object, ticket));

        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, shared).await.map_err(|_| {
                PolicyError::download_failed(&object.id, "request deadline exceeded")
            })?,
            None => shared.await,
        }
    }

    async fn download(&self, object: &PolicyObjectRef, ticket: &Path) -> Result<RawPolicyObject> {
        debug!(location = %object.location, "downloading policy object");

        let download = self.transport.download(&object.location, ticket);
        let raw = tokio::time::timeout(self.timeout, download)
            .await
            .map_err(|_| PolicyError::download_failed(&object.id, "download timed out"))?
            .map_err(|e| match e {
                TransportError::Unreachable(reason) => {
                    PolicyError::download_failed(&object.id, reason)
                }
                TransportError::MissingResource(what) => {
                    PolicyError::corrupt(&object.id, format!("missing {what}"))
                }
            })?;

        self.store(&object.id, &raw).await?;
        info!(gpo_id = %object.id, "policy object downloaded");
        Ok(raw)
    }

    async fn store(&self, id: &str, raw: &RawPolicyObject) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PolicyError::setup_failed(&self.dir, e))?;

        let bytes = bincode::serialize(raw)
            .map_err(|e| PolicyError::storage(format!("encode {id}: {e}")))?;
        write_atomic(&self.cached_path(id), &bytes, None)
            .await
            .map_err(|e| PolicyError::storage(format!("write {id}: {e}")))
    }

    /// Last downloaded copy of `id`, if any
    #[cfg(test)]
    pub(crate) async fn load_cached(&self, id: &str) -> Result<Option<RawPolicyObject>> {
        let bytes = match fs::read(self.cached_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PolicyError::storage(format!("read {id}: {e}"))),
        };
        bincode::deserialize(&bytes)
            .map(Some)
            .map_err(|e| PolicyError::storage(format!("decode {id}: {e}")))
    }
}
