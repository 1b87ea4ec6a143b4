//! Unified error system for policy resolution
//!
//! A single error type covers the whole resolution pipeline. Every variant
//! carries enough context (identity, object id, path) to be reported without
//! the caller having to re-derive it.

use crate::types::ObjectClass;
use std::path::PathBuf;

/// Unified error type for all policy resolution operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// No usable Kerberos credential for the identity
    #[error("no credential available for {identity}: {reason}")]
    CredentialUnavailable {
        /// Identity the ticket was requested for
        identity: String,
        /// Why the ticket could not be obtained
        reason: String,
    },

    /// Runtime directories could not be created or written
    #[error("setup failed for {}: {reason}", path.display())]
    SetupFailed {
        /// Directory or file that could not be prepared
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Directory is offline and no cached resolution exists
    #[error("directory unreachable and no cached policies for {identity}")]
    DirectoryUnreachable {
        /// Identity being resolved
        identity: String,
    },

    /// Directory answered with an error other than being offline
    #[error("directory query failed for {identity}: {reason}")]
    DirectoryQueryFailed {
        /// Identity being resolved
        identity: String,
        /// Error reported by the directory adapter
        reason: String,
    },

    /// A policy object could not be downloaded
    #[error("failed to download policy {id}: {reason}")]
    DownloadFailed {
        /// Policy object identifier
        id: String,
        /// Transport failure
        reason: String,
    },

    /// A policy object is structurally invalid
    #[error("corrupt policy {id}: {reason}")]
    CorruptSource {
        /// Policy object identifier
        id: String,
        /// What was malformed
        reason: String,
    },

    /// A policy object has no content for the requested object class
    #[error("policy {id} has no {requested} content")]
    ObjectClassMismatch {
        /// Policy object identifier
        id: String,
        /// Object class that was requested
        requested: ObjectClass,
    },

    /// A computer identity does not name the local machine
    #[error("{identity} does not match local hostname {hostname}")]
    IdentityMismatch {
        /// Requested computer identity
        identity: String,
        /// Local hostname
        hostname: String,
    },

    /// Persisted state the operation depends on is missing
    #[error("state unavailable: {reason}")]
    StateUnavailable {
        /// What is missing
        reason: String,
    },

    /// Identity name cannot be used
    #[error("invalid identity {name:?}: {reason}")]
    InvalidIdentity {
        /// Name as supplied
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration is incomplete or inconsistent
    #[error("invalid configuration: {field} - {reason}")]
    Configuration {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// A cache record could not be read or written
    #[error("storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },
}

impl PolicyError {
    /// Create a credential unavailable error
    pub fn credential_unavailable(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CredentialUnavailable {
            identity: identity.into(),
            reason: reason.into(),
        }
    }

    /// Create a setup failed error
    pub fn setup_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SetupFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a download failed error
    pub fn download_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a corrupt source error
    pub fn corrupt(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptSource {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a state unavailable error
    pub fn state_unavailable(reason: impl Into<String>) -> Self {
        Self::StateUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Whether this error must abort a whole resolution.
    ///
    /// An object class mismatch only empties the rules of one GPO.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ObjectClassMismatch { .. })
    }
}

/// Standard Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;
