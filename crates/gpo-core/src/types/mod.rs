//! Core policy types

mod gpo;
mod identity;

pub use gpo::{Entry, Gpo, PolicyObjectRef, RawPolicyObject, Rules};
pub use identity::{Identity, ObjectClass};
