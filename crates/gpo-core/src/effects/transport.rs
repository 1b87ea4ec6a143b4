//! Policy object transport effect

use crate::types::RawPolicyObject;
use async_trait::async_trait;
use std::path::Path;

/// Failure of a policy object download
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Location could not be read
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// A mandatory sub-resource of the object is missing
    #[error("missing {0}")]
    MissingResource(String),
}

/// Downloads the content of one policy object
#[async_trait]
pub trait TransportEffects: Send + Sync {
    /// Fetch the manifest and Registry.pol documents stored at `location`
    async fn download(
        &self,
        location: &str,
        ticket: &Path,
    ) -> Result<RawPolicyObject, TransportError>;
}
