//! # GPO Effects - Handlers
//!
//! **Purpose**: Stateful handlers behind the resolution pipeline: private
//! ticket copies, the per-object download cache, persisted resolutions and the
//! concrete directory and transport implementations.
//!
//! # Architecture Constraints
//!
//! **This crate owns all filesystem and process I/O.**
//! - YES identity-keyed state stores rooted at caller supplied directories
//! - YES temp-file-then-rename writes for every persisted file
//! - YES implementations of [`gpo_core::DirectoryEffects`] and [`gpo_core::TransportEffects`]
//! - NO process-wide singletons; every store is an owned handle
//! - NO resolution ordering or fallback decisions (that's `gpo-agent`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod atomic;

/// Command-backed directory adapter
pub mod directory;

/// Per-object download cache
pub mod download_cache;

/// Persisted resolutions per identity
pub mod resolution_cache;

/// Deduplication of concurrent work by key
pub mod singleflight;

/// Private Kerberos ticket copies
pub mod ticket_cache;

/// Policy object transports
pub mod transport;

pub use directory::{parse_gpo_list, CommandDirectory, OFFLINE_EXIT_CODE};
pub use download_cache::DownloadCache;
pub use resolution_cache::ResolutionCache;
pub use singleflight::Singleflight;
pub use ticket_cache::{PreparedTicket, TicketCacheManager};
pub use transport::FilesystemTransport;
