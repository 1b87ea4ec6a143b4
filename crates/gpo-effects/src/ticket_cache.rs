//! Private Kerberos ticket copies
//!
//! Every identity resolved at least once owns a private copy of its ticket
//! under `<run_dir>/krb5cc/<identity>`. User copies come from the ticket
//! supplied with the request; the machine copy always comes from the system
//! credential store. The original tickets are never modified.

use crate::atomic::{is_temp_name, write_atomic};
use gpo_core::{Identity, ObjectClass, PolicyError, Result};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const KRB5_CACHE_DIR: &str = "krb5cc";
const TICKET_MODE: u32 = 0o600;

/// A private ticket ready to authenticate directory and transport calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTicket {
    /// Private copy to hand to the directory and transport
    pub path: PathBuf,
    /// Content differs from the copy made by the previous resolution
    pub refreshed: bool,
}

/// Manages private ticket copies under the run directory
#[derive(Debug, Clone)]
pub struct TicketCacheManager {
    krb5_dir: PathBuf,
    machine_source: PathBuf,
}

impl TicketCacheManager {
    /// Create a manager rooted at `run_dir`.
    ///
    /// The machine ticket is read from `<sss_cache_dir>/ccache_<REALM>`.
    pub fn new(run_dir: &Path, sss_cache_dir: &Path, ad_domain: &str) -> Self {
        Self {
            krb5_dir: run_dir.join(KRB5_CACHE_DIR),
            machine_source: sss_cache_dir.join(format!("ccache_{}", ad_domain.to_uppercase())),
        }
    }

    /// Create the private copy directory if missing
    pub fn create_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.krb5_dir)
            .map_err(|e| PolicyError::setup_failed(&self.krb5_dir, e))
    }

    /// Directory holding the private copies
    pub fn krb5_cache_dir(&self) -> &Path {
        &self.krb5_dir
    }

    /// Path of the private copy for `identity`, whether or not it exists
    pub fn ticket_path(&self, identity: &Identity) -> PathBuf {
        self.krb5_dir.join(identity.name())
    }

    /// Materialize the private ticket for `identity`.
    ///
    /// A user without a supplied ticket reuses the copy of its previous
    /// resolution. A computer always copies the system credential store and
    /// ignores `supplied`.
    pub async fn prepare(
        &self,
        identity: &Identity,
        supplied: Option<&Path>,
    ) -> Result<PreparedTicket> {
        fs::create_dir_all(&self.krb5_dir)
            .await
            .map_err(|e| PolicyError::setup_failed(&self.krb5_dir, e))?;

        let target = self.ticket_path(identity);
        let source = match identity.object_class() {
            ObjectClass::Computer => Some(self.machine_source.as_path()),
            ObjectClass::User => supplied.filter(|p| !p.as_os_str().is_empty()),
        };

        let Some(source) = source else {
            return match fs::metadata(&target).await {
                Ok(meta) if meta.is_file() => {
                    debug!(identity = %identity, "reusing private ticket");
                    Ok(PreparedTicket {
                        path: target,
                        refreshed: false,
                    })
                }
                _ => Err(PolicyError::credential_unavailable(
                    identity.name(),
                    "no ticket supplied and no previous resolution",
                )),
            };
        };

        let content = fs::read(source).await.map_err(|e| {
            PolicyError::credential_unavailable(
                identity.name(),
                format!("cannot read {}: {e}", source.display()),
            )
        })?;

        let refreshed = match fs::read(&target).await {
            Ok(previous) => blake3::hash(&previous) != blake3::hash(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(PolicyError::setup_failed(&target, e)),
        };

        write_atomic(&target, &content, Some(TICKET_MODE))
            .await
            .map_err(|e| PolicyError::setup_failed(&target, e))?;

        info!(identity = %identity, refreshed, "prepared private ticket");
        Ok(PreparedTicket {
            path: target,
            refreshed,
        })
    }

    /// User identities holding a private ticket copy
    pub async fn list_known_identities(&self) -> Result<BTreeSet<String>> {
        let mut entries = fs::read_dir(&self.krb5_dir).await.map_err(|e| {
            PolicyError::state_unavailable(format!("{}: {e}", self.krb5_dir.display()))
        })?;

        let mut users = BTreeSet::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PolicyError::state_unavailable(e.to_string()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_temp_name(&name) || !name.contains('@') {
                continue;
            }
            users.insert(name);
        }
        Ok(users)
    }
}
