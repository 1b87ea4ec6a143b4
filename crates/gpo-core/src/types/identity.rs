//! Identities policies are resolved for
//!
//! A user identity is a Kerberos principal `name@REALM`. The realm is
//! case-insensitive and is canonicalized to upper case so that
//! `bob@example.com` and `bob@EXAMPLE.COM` share tickets and cache records.
//! A computer identity is the local hostname.

use crate::errors::{PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory object class of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    /// A user principal
    User,
    /// The local machine
    Computer,
}

impl ObjectClass {
    /// Name used when querying the directory
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::User => "user",
            ObjectClass::Computer => "computer",
        }
    }

    /// Policy object subdirectory holding this class's Registry.pol
    pub fn policy_dir(&self) -> &'static str {
        match self {
            ObjectClass::User => "User",
            ObjectClass::Computer => "Machine",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user principal or machine that policies are resolved for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    name: String,
    class: ObjectClass,
}

impl Identity {
    /// Create a user identity from a `name@REALM` principal
    pub fn user(principal: &str) -> Result<Self> {
        let (user, realm) = principal
            .rsplit_once('@')
            .ok_or_else(|| invalid(principal, "user principal must be name@REALM"))?;
        if user.is_empty() || realm.is_empty() {
            return Err(invalid(principal, "empty user or realm"));
        }
        let name = format!("{}@{}", user, realm.to_uppercase());
        validate_file_name(&name)?;

        Ok(Self {
            name,
            class: ObjectClass::User,
        })
    }

    /// Create a computer identity from a hostname
    pub fn computer(hostname: &str) -> Result<Self> {
        if hostname.is_empty() {
            return Err(invalid(hostname, "empty hostname"));
        }
        if hostname.contains('@') {
            return Err(invalid(hostname, "hostname cannot contain '@'"));
        }
        validate_file_name(hostname)?;

        Ok(Self {
            name: hostname.to_string(),
            class: ObjectClass::Computer,
        })
    }

    /// Create an identity of the given class
    pub fn new(name: &str, class: ObjectClass) -> Result<Self> {
        match class {
            ObjectClass::User => Self::user(name),
            ObjectClass::Computer => Self::computer(name),
        }
    }

    /// Canonical name, used to key tickets and cache records
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name sent to the directory: the principal without its realm
    pub fn directory_name(&self) -> &str {
        match self.name.rsplit_once('@') {
            Some((user, _)) => user,
            None => &self.name,
        }
    }

    /// Kerberos realm of a user identity
    pub fn realm(&self) -> Option<&str> {
        self.name.rsplit_once('@').map(|(_, realm)| realm)
    }

    /// Object class of this identity
    pub fn object_class(&self) -> ObjectClass {
        self.class
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn invalid(name: &str, reason: &str) -> PolicyError {
    PolicyError::InvalidIdentity {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

// Identity names become file names under the run and cache directories.
fn validate_file_name(name: &str) -> Result<()> {
    if name.starts_with('.') || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(invalid(name, "contains path characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_realm_is_case_insensitive() {
        let lower = Identity::user("bob@example.com").unwrap();
        let upper = Identity::user("bob@EXAMPLE.COM").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.name(), "bob@EXAMPLE.COM");
        assert_eq!(lower.realm(), Some("EXAMPLE.COM"));
    }

    #[test]
    fn test_directory_name_strips_realm() {
        let user = Identity::user("bob@EXAMPLE.COM").unwrap();
        assert_eq!(user.directory_name(), "bob");

        let machine = Identity::computer("ws-042").unwrap();
        assert_eq!(machine.directory_name(), "ws-042");
        assert_eq!(machine.realm(), None);
    }

    #[test]
    fn test_rejects_malformed_names() {
        assert_matches!(Identity::user("bob"), Err(PolicyError::InvalidIdentity { .. }));
        assert_matches!(Identity::user("@EXAMPLE.COM"), Err(PolicyError::InvalidIdentity { .. }));
        assert_matches!(Identity::user("../x@EXAMPLE.COM"), Err(PolicyError::InvalidIdentity { .. }));
        assert_matches!(Identity::computer("bob@EXAMPLE.COM"), Err(PolicyError::InvalidIdentity { .. }));
        assert_matches!(Identity::computer(""), Err(PolicyError::InvalidIdentity { .. }));
    }

    #[test]
    fn test_new_dispatches_on_class() {
        let id = Identity::new("host1", ObjectClass::Computer).unwrap();
        assert_eq!(id.object_class(), ObjectClass::Computer);
        assert_eq!(ObjectClass::Computer.policy_dir(), "Machine");
        assert_eq!(ObjectClass::User.to_string(), "user");
    }
}
