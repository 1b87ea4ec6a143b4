//! Registry.pol records to domain rules
//!
//! Only keys below `Software\Policies\<distro>\` are recognized. The first
//! path component below that prefix is the domain and the remaining components,
//! joined with `/`, form the entry key.
//!
//! Value names carry the release scope of a record:
//!
//! | Value name          | Meaning                                        |
//! |---------------------|------------------------------------------------|
//! | `all` or empty      | value for every release                        |
//! | `<release>`         | value for one release only                     |
//! | `Override<release>` | DWORD marker enabling the release value        |
//! | `**del.<name>`      | the named record is explicitly disabled        |
//!
//! For each (domain, key) the release value wins over the `all` value when
//! it targets the current release and its marker is not disabled.

use crate::errors::{PolicyError, Result};
use crate::manifest::parse_manifest;
use crate::registry::{self, RegistryData, RegistryRecord};
use crate::types::{Entry, ObjectClass, RawPolicyObject, Rules};
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use tracing::debug;

/// Distribution whose policy namespace is recognized by default
pub const DEFAULT_DISTRO: &str = "Ubuntu";

const DISABLED_PREFIX: &str = "**del.";
const OVERRIDE_PREFIX: &str = "override";

/// Turns downloaded policy objects into rules for one release
#[derive(Debug, Clone)]
pub struct PolicyParser {
    namespace: String,
    release: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope<'a> {
    AllReleases,
    Release(&'a str),
    Override(&'a str),
}

#[derive(Debug, Clone)]
struct Candidate {
    value: String,
    disabled: bool,
}

#[derive(Debug, Default)]
struct Candidates {
    all_releases: Option<Candidate>,
    current_release: Option<Candidate>,
    override_enabled: Option<bool>,
}

impl Candidates {
    fn effective(self, key: String) -> Option<Entry> {
        let release = match self.override_enabled {
            Some(false) => None,
            _ => self.current_release,
        };
        release.or(self.all_releases).map(|c| Entry {
            key,
            value: c.value,
            disabled: c.disabled,
        })
    }
}

impl PolicyParser {
    /// Create a parser for `distro` keys resolving overrides for `release`
    pub fn new(distro: &str, release: impl Into<String>) -> Self {
        Self {
            namespace: format!(r"software\policies\{}\", distro.to_ascii_lowercase()),
            release: release.into(),
        }
    }

    /// Release overrides are resolved for
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Parse the rules of `raw` applicable to `class`.
    ///
    /// Returns [`PolicyError::ObjectClassMismatch`] when the object carries no
    /// document for `class`.
    pub fn parse(&self, id: &str, raw: &RawPolicyObject, class: ObjectClass) -> Result<Rules> {
        parse_manifest(&raw.manifest)
            .map_err(|e| PolicyError::corrupt(id, format!("GPT.INI: {e}")))?;

        let document = match class {
            ObjectClass::User => raw.user.as_deref(),
            ObjectClass::Computer => raw.machine.as_deref(),
        };
        let Some(document) = document else {
            return Err(PolicyError::ObjectClassMismatch {
                id: id.to_string(),
                requested: class,
            });
        };

        let records = registry::decode(document).map_err(|e| {
            PolicyError::corrupt(id, format!("{}/Registry.pol: {e}", class.policy_dir()))
        })?;
        self.resolve(id, &records)
    }

    /// Resolve release overrides and drop foreign keys
    pub fn resolve(&self, id: &str, records: &[RegistryRecord]) -> Result<Rules> {
        let mut order = Vec::new();
        let mut candidates: HashMap<(String, String), Candidates> = HashMap::new();

        for record in records {
            let Some((domain, key)) = self.split_key(&record.key) else {
                debug!(gpo_id = %id, key = %record.key, "ignoring key outside policy namespace");
                continue;
            };
            let (scope, disabled) = classify(&record.value_name);

            let slot = match candidates.entry((domain, key)) {
                MapEntry::Occupied(e) => e.into_mut(),
                MapEntry::Vacant(e) => {
                    order.push(e.key().clone());
                    e.insert(Candidates::default())
                }
            };
            let duplicate = |what: &str| {
                PolicyError::corrupt(id, format!("duplicate {what} for {}", record.key))
            };

            match scope {
                Scope::AllReleases => {
                    if slot.all_releases.is_some() {
                        return Err(duplicate("all releases value"));
                    }
                    slot.all_releases = Some(candidate(&record.data, disabled));
                }
                Scope::Release(release) if release == self.release => {
                    if slot.current_release.is_some() {
                        return Err(duplicate("release value"));
                    }
                    slot.current_release = Some(candidate(&record.data, disabled));
                }
                Scope::Override(release) if !self.release.is_empty() && release == self.release => {
                    if slot.override_enabled.is_some() {
                        return Err(duplicate("override marker"));
                    }
                    let enabled = !disabled && marker_enabled(&record.data).ok_or_else(|| {
                        PolicyError::corrupt(
                            id,
                            format!("invalid override marker for {}", record.key),
                        )
                    })?;
                    slot.override_enabled = Some(enabled);
                }
                Scope::Release(_) | Scope::Override(_) => {}
            }
        }

        let mut rules = Rules::new();
        for (domain, key) in order {
            let Some(slot) = candidates.remove(&(domain.clone(), key.clone())) else {
                continue;
            };
            if let Some(entry) = slot.effective(key) {
                rules.entry(domain).or_default().push(entry);
            }
        }
        Ok(rules)
    }

    fn split_key(&self, key: &str) -> Option<(String, String)> {
        // ASCII lowercasing keeps byte offsets intact.
        if !key.to_ascii_lowercase().starts_with(&self.namespace) {
            return None;
        }
        let mut parts = key[self.namespace.len()..]
            .split('\\')
            .filter(|p| !p.is_empty());
        let domain = parts.next()?.to_string();
        let key = parts.collect::<Vec<_>>().join("/");
        if key.is_empty() {
            return None;
        }
        Some((domain, key))
    }
}

fn classify(value_name: &str) -> (Scope<'_>, bool) {
    let (name, disabled) = match value_name.strip_prefix(DISABLED_PREFIX) {
        Some(rest) => (rest, true),
        None => (value_name, false),
    };

    let scope = if name.is_empty() || name.eq_ignore_ascii_case("all") {
        Scope::AllReleases
    } else if let Some(release) = strip_prefix_ignore_case(name, OVERRIDE_PREFIX) {
        Scope::Override(release)
    } else {
        Scope::Release(name)
    };
    (scope, disabled)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn candidate(data: &RegistryData, disabled: bool) -> Candidate {
    if disabled {
        return Candidate {
            value: String::new(),
            disabled: true,
        };
    }
    Candidate {
        value: data.render(),
        disabled: false,
    }
}

fn marker_enabled(data: &RegistryData) -> Option<bool> {
    match data {
        RegistryData::Dword(v) => Some(*v != 0),
        RegistryData::Qword(v) => Some(*v != 0),
        RegistryData::String(s) => match s.trim() {
            "1" => Some(true),
            "0" => Some(false),
            other if other.eq_ignore_ascii_case("true") => Some(true),
            other if other.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::encode;
    use assert_matches::assert_matches;

    const DCONF_A: &str = r"Software\Policies\Ubuntu\dconf\A";

    fn sz(key: &str, name: &str, value: &str) -> RegistryRecord {
        RegistryRecord::new(key, name, RegistryData::String(value.to_string()))
    }

    fn marker(key: &str, release: &str, enabled: bool) -> RegistryRecord {
        RegistryRecord::new(
            key,
            format!("Override{release}"),
            RegistryData::Dword(u32::from(enabled)),
        )
    }

    fn dconf(entries: Vec<Entry>) -> Rules {
        Rules::from([("dconf".to_string(), entries)])
    }

    fn raw(user: Option<Vec<RegistryRecord>>, machine: Option<Vec<RegistryRecord>>) -> RawPolicyObject {
        RawPolicyObject {
            manifest: "[General]\nVersion=1\n".to_string(),
            user: user.map(|r| encode(&r)),
            machine: machine.map(|r| encode(&r)),
        }
    }

    #[test]
    fn test_release_override_wins_for_matching_release() {
        let records = vec![
            sz(DCONF_A, "all", "AllValue"),
            sz(DCONF_A, "21.04", "21.04Value"),
            marker(DCONF_A, "21.04", true),
        ];

        let current = PolicyParser::new("Ubuntu", "21.04").resolve("g", &records).unwrap();
        assert_eq!(current, dconf(vec![Entry::new("A", "21.04Value")]));

        let other = PolicyParser::new("Ubuntu", "20.04").resolve("g", &records).unwrap();
        assert_eq!(other, dconf(vec![Entry::new("A", "AllValue")]));
    }

    #[test]
    fn test_disabled_marker_falls_back_to_all_releases() {
        let records = vec![
            sz(DCONF_A, "all", "AllValue"),
            sz(DCONF_A, "21.04", "21.04Value"),
            marker(DCONF_A, "21.04", false),
        ];
        let rules = PolicyParser::new("Ubuntu", "21.04").resolve("g", &records).unwrap();
        assert_eq!(rules, dconf(vec![Entry::new("A", "AllValue")]));
    }

    #[test]
    fn test_disabled_release_value_blanks_key_for_that_release_only() {
        let records = vec![
            sz(DCONF_A, "all", "AllValue"),
            sz(DCONF_A, "**del.21.04", " "),
            marker(DCONF_A, "21.04", true),
        ];

        let current = PolicyParser::new("Ubuntu", "21.04").resolve("g", &records).unwrap();
        assert_eq!(current, dconf(vec![Entry::disabled("A")]));

        let other = PolicyParser::new("Ubuntu", "22.04").resolve("g", &records).unwrap();
        assert_eq!(other, dconf(vec![Entry::new("A", "AllValue")]));
    }

    #[test]
    fn test_release_value_without_all_releases_value() {
        let records = vec![sz(DCONF_A, "21.04", "only")];
        let current = PolicyParser::new("Ubuntu", "21.04").resolve("g", &records).unwrap();
        assert_eq!(current, dconf(vec![Entry::new("A", "only")]));

        let other = PolicyParser::new("Ubuntu", "20.04").resolve("g", &records).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_duplicate_release_value_is_corrupt() {
        let records = vec![sz(DCONF_A, "21.04", "one"), sz(DCONF_A, "21.04", "two")];
        assert_matches!(
            PolicyParser::new("Ubuntu", "21.04").resolve("g", &records),
            Err(PolicyError::CorruptSource { .. })
        );
        // Other releases never look at those records.
        assert!(PolicyParser::new("Ubuntu", "20.04")
            .resolve("g", &records)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_foreign_keys_are_dropped() {
        let records = vec![
            sz(DCONF_A, "all", "standardA"),
            sz(r"Software\Policies\Microsoft\Windows\Explorer\B", "all", "foreign"),
            sz(r"software\policies\ubuntu\dconf\C", "all", "standardC"),
            sz(r"Software\Policies\Ubuntu\dconf", "all", "no key"),
        ];
        let rules = PolicyParser::new("Ubuntu", "").resolve("g", &records).unwrap();
        assert_eq!(
            rules,
            dconf(vec![Entry::new("A", "standardA"), Entry::new("C", "standardC")])
        );
    }

    #[test]
    fn test_domains_are_partitioned_and_keys_keep_parse_order() {
        let records = vec![
            sz(r"Software\Policies\Ubuntu\dconf\org\gnome\z", "all", "1"),
            sz(r"Software\Policies\Ubuntu\other\C", "all", "otherC"),
            sz(r"Software\Policies\Ubuntu\dconf\org\gnome\a", "all", "2"),
            sz(r"Software\Policies\Ubuntu\dconf\C", "all", "dconfC"),
        ];
        let rules = PolicyParser::new("Ubuntu", "").resolve("g", &records).unwrap();
        assert_eq!(
            rules["dconf"],
            vec![
                Entry::new("org/gnome/z", "1"),
                Entry::new("org/gnome/a", "2"),
                Entry::new("C", "dconfC"),
            ]
        );
        assert_eq!(rules["other"], vec![Entry::new("C", "otherC")]);
    }

    #[test]
    fn test_parse_selects_document_for_class() {
        let object = raw(None, Some(vec![sz(DCONF_A, "all", "machA")]));
        let parser = PolicyParser::new("Ubuntu", "");

        let machine = parser.parse("machine-only", &object, ObjectClass::Computer).unwrap();
        assert_eq!(machine, dconf(vec![Entry::new("A", "machA")]));

        assert_matches!(
            parser.parse("machine-only", &object, ObjectClass::User),
            Err(PolicyError::ObjectClassMismatch { requested: ObjectClass::User, .. })
        );
    }

    #[test]
    fn test_parse_rejects_corrupt_content() {
        let parser = PolicyParser::new("Ubuntu", "");

        let mut bad_manifest = raw(Some(vec![]), None);
        bad_manifest.manifest = "[General]\n".to_string();
        assert_matches!(
            parser.parse("g", &bad_manifest, ObjectClass::User),
            Err(PolicyError::CorruptSource { .. })
        );

        let mut bad_pol = raw(None, None);
        bad_pol.user = Some(b"PReg\x01\0\0\0[".to_vec());
        assert_matches!(
            parser.parse("g", &bad_pol, ObjectClass::User),
            Err(PolicyError::CorruptSource { .. })
        );
    }

    #[test]
    fn test_invalid_override_marker_is_corrupt() {
        let records = vec![
            sz(DCONF_A, "all", "AllValue"),
            sz(DCONF_A, "Override21.04", "maybe"),
        ];
        assert_matches!(
            PolicyParser::new("Ubuntu", "21.04").resolve("g", &records),
            Err(PolicyError::CorruptSource { .. })
        );
    }
}
