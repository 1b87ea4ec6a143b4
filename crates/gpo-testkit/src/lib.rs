//! GPO Testing Infrastructure
//!
//! Deterministic doubles and on-disk fixtures shared by the resolver tests.
//!
//! # Usage
//!
//! ```rust,no_run
//! use gpo_testkit::*;
//!
//! let sysvol = SysvolFixture::with_standard_objects();
//! let directory = ScriptedDirectory::new(SYSVOL_LOCATION);
//! directory.answer("bob", &["one-value", "standard"]);
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod directory;
pub mod records;
pub mod sysvol;
pub mod tickets;
pub mod transport;

pub use directory::ScriptedDirectory;
pub use records::*;
pub use sysvol::{SysvolFixture, SYSVOL_LOCATION};
pub use tickets::{write_machine_ticket, write_ticket};
pub use transport::DelayedTransport;
