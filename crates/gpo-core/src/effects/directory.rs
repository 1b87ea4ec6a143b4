//! Directory query effect

use crate::types::{Identity, PolicyObjectRef};
use async_trait::async_trait;
use std::path::Path;

/// Failure of a directory query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Directory could not be reached; the caller may fall back to its cache
    #[error("directory offline: {0}")]
    Offline(String),

    /// Directory was reached but the query failed
    #[error("directory query failed: {0}")]
    Failed(String),
}

/// Lists the policy objects that apply to an identity
#[async_trait]
pub trait DirectoryEffects: Send + Sync {
    /// Ordered list of applicable objects, closest to the identity first.
    ///
    /// `ticket` is the private Kerberos credential cache to authenticate with.
    async fn list_applicable_objects(
        &self,
        identity: &Identity,
        ticket: &Path,
    ) -> Result<Vec<PolicyObjectRef>, DirectoryError>;
}
