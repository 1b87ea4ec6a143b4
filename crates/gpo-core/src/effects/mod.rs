//! Effect traits for the resolution pipeline
//!
//! The orchestrator only talks to the directory and to the network through
//! these traits so that tests can swap in deterministic doubles.

mod directory;
mod transport;

pub use directory::{DirectoryEffects, DirectoryError};
pub use transport::{TransportEffects, TransportError};
