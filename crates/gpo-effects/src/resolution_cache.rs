//! Persisted resolutions per identity
//!
//! The ordered GPO list of the last successful online resolution for an
//! identity is stored as JSON in `<cache_dir>/gpo_rules/<identity>`.

use crate::atomic::write_atomic;
use gpo_core::{Gpo, Identity, PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

const RULES_DIR: &str = "gpo_rules";
const RECORD_VERSION: u32 = 1;

#[derive(Serialize)]
struct RecordRef<'a> {
    version: u32,
    gpos: &'a [Gpo],
}

#[derive(Deserialize)]
struct Record {
    version: u32,
    gpos: Vec<Gpo>,
}

/// Last known good resolution of every identity
#[derive(Debug, Clone)]
pub struct ResolutionCache {
    dir: PathBuf,
}

impl ResolutionCache {
    /// Create a store under `<cache_dir>/gpo_rules`
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join(RULES_DIR),
        }
    }

    /// Create the record directory if missing
    pub fn create_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PolicyError::setup_failed(&self.dir, e))
    }

    /// Record file of `identity`
    pub fn record_path(&self, identity: &Identity) -> PathBuf {
        self.dir.join(identity.name())
    }

    /// Replace the record of `identity`
    pub async fn save(&self, identity: &Identity, gpos: &[Gpo]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PolicyError::setup_failed(&self.dir, e))?;

        let json = serde_json::to_vec_pretty(&RecordRef {
            version: RECORD_VERSION,
            gpos,
        })
        .map_err(|e| PolicyError::storage(format!("encode record for {identity}: {e}")))?;

        write_atomic(&self.record_path(identity), &json, None)
            .await
            .map_err(|e| PolicyError::storage(format!("write record for {identity}: {e}")))?;
        debug!(identity = %identity, gpos = gpos.len(), "resolution record saved");
        Ok(())
    }

    /// Record of `identity`, if one was ever saved
    pub async fn load(&self, identity: &Identity) -> Result<Option<Vec<Gpo>>> {
        let bytes = match fs::read(self.record_path(identity)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PolicyError::storage(format!(
                    "read record for {identity}: {e}"
                )))
            }
        };

        let record: Record = serde_json::from_slice(&bytes)
            .map_err(|e| PolicyError::storage(format!("decode record for {identity}: {e}")))?;
        if record.version != RECORD_VERSION {
            return Err(PolicyError::storage(format!(
                "record for {identity} has unsupported version {}",
                record.version
            )));
        }
        Ok(Some(record.gpos))
    }

    /// Modification time of the record of `identity`, if any
    pub async fn last_modified(&self, identity: &Identity) -> Result<Option<SystemTime>> {
        match fs::metadata(self.record_path(identity)).await {
            Ok(meta) => meta
                .modified()
                .map(Some)
                .map_err(|e| PolicyError::storage(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PolicyError::storage(format!(
                "stat record for {identity}: {e}"
            ))),
        }
    }
}
