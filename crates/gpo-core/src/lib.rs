//! # GPO Core - Foundation
//!
//! **Purpose**: Define the policy domain types, the policy object parser and the
//! precedence merge engine shared by every other crate in the workspace.
//!
//! # Architecture Constraints
//!
//! **This crate has no I/O.**
//! - YES identity, GPO and entry types
//! - YES Registry.pol and GPT.INI decoding
//! - YES multi-release override resolution and first-match-wins merging
//! - YES effect traits for the directory and the object transport
//! - NO filesystem, process or network handlers (that's `gpo-effects`)
//! - NO request orchestration (that's `gpo-agent`)
//!
//! ## Core Concepts
//!
//! - **Identity**: a user principal or the local machine, classified by [`ObjectClass`]
//! - **GPO**: an ordered, domain-partitioned rule set; list order is precedence order
//! - **Release scope**: an override applied only when the current release matches
//! - **Unique rules**: one effective [`Entry`] per (domain, key) after merging

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Effect traits implemented by directory and transport handlers
pub mod effects;

/// Unified policy error taxonomy
pub mod errors;

/// GPT.INI manifest reader
pub mod manifest;

/// First-match-wins merge across ordered GPOs
pub mod merge;

/// Registry.pol records to domain rules
pub mod parser;

/// Registry.pol (PReg) codec
pub mod registry;

/// Identity, GPO and entry types
pub mod types;

pub use effects::{DirectoryEffects, DirectoryError, TransportEffects, TransportError};
pub use errors::{PolicyError, Result};
pub use merge::{tag_overridden, unique_rules, UniqueRules};
pub use parser::PolicyParser;
pub use types::{Entry, Gpo, Identity, ObjectClass, PolicyObjectRef, RawPolicyObject, Rules};
