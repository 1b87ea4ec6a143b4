//! # GPO Agent - Orchestration
//!
//! **Purpose**: Resolve the ordered policy objects that apply to a user or to
//! the local machine, persist them as the last known good resolution and
//! serve that resolution while the directory is unreachable.
//!
//! # Architecture Constraints
//!
//! - YES request sequencing: mapping check, ticket, directory, fetch and parse, persist
//! - YES offline fallback and the taxonomy errors of a failed resolution
//! - YES configuration loading and logging bootstrap
//! - NO file formats or parsing (that's `gpo-core`)
//! - NO direct file or process handling (that's `gpo-effects`)
//! - NO applying rules to the system; consumers merge with [`Resolution::unique_rules`]
//!
//! ## Usage
//!
//! ```no_run
//! use gpo_agent::{PolicyConfig, PolicyResolver, RequestContext};
//! use gpo_core::Identity;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn run() -> gpo_core::Result<()> {
//! let config = PolicyConfig::load_from_file(Path::new("/etc/gpo/gpo.toml"))?;
//! let resolver = PolicyResolver::new(&config)?;
//!
//! let bob = Identity::user("bob@example.com")?;
//! let ctx = RequestContext::with_timeout(Duration::from_secs(60));
//! let resolution = resolver
//!     .get_policies(&ctx, &bob, Some(Path::new("/tmp/krb5cc_1000")))
//!     .await?;
//! for (domain, entries) in resolution.unique_rules() {
//!     println!("{domain}: {} keys", entries.len());
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Resolver configuration
pub mod config;

/// Per-request deadline
pub mod context;

mod dump;

/// Logging bootstrap
pub mod logging;

/// Resolution orchestrator
pub mod resolver;

pub use config::{detect_release, PolicyConfig};
pub use context::RequestContext;
pub use resolver::{PolicyResolver, Resolution};
