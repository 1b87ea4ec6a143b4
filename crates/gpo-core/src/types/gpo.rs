//! GPO and entry types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One configuration key inside a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Key, unique within one (GPO, domain) pair
    pub key: String,
    /// Value as a string; empty for disabled entries
    pub value: String,
    /// The key is explicitly unset. Still takes part in precedence.
    #[serde(default)]
    pub disabled: bool,
}

impl Entry {
    /// Create an enabled entry
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            disabled: false,
        }
    }

    /// Create an entry that blanks its key
    pub fn disabled(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            disabled: true,
        }
    }
}

/// Entries per domain, in parse order
pub type Rules = BTreeMap<String, Vec<Entry>>;

/// A directory-distributed policy object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gpo {
    /// Object identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Rules applicable to the requested object class
    #[serde(default)]
    pub rules: Rules,
}

impl Gpo {
    /// Create a GPO with no rules
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rules: Rules::new(),
        }
    }

    /// Add entries for a domain
    pub fn with_domain(mut self, domain: impl Into<String>, entries: Vec<Entry>) -> Self {
        self.rules.insert(domain.into(), entries);
        self
    }
}

/// A policy object as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyObjectRef {
    /// Object identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Network location of the object content
    pub location: String,
}

impl PolicyObjectRef {
    /// Build a reference whose id is the last path segment of its location
    pub fn from_location(name: impl Into<String>, location: impl Into<String>) -> Option<Self> {
        let location = location.into();
        let id = location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && !segment.contains(':'))?
            .to_string();

        Some(Self {
            id,
            name: name.into(),
            location,
        })
    }
}

/// Downloaded content of one policy object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPolicyObject {
    /// GPT.INI text
    pub manifest: String,
    /// User/Registry.pol bytes, when present
    pub user: Option<Vec<u8>>,
    /// Machine/Registry.pol bytes, when present
    pub machine: Option<Vec<u8>>,
}
