//! First-match-wins merge across ordered GPOs
//!
//! The list order of GPOs is the only source of precedence. For every domain
//! the first GPO defining a key wins, whether the entry carries a value or
//! is disabled. Later entries for the same key are discarded.

use crate::types::{Entry, Gpo};
use std::collections::{BTreeMap, HashSet};

/// One effective entry per (domain, key)
pub type UniqueRules = BTreeMap<String, BTreeMap<String, Entry>>;

/// Compute the effective entry of every (domain, key) over `gpos`.
///
/// `gpos[0]` has the highest precedence.
pub fn unique_rules(gpos: &[Gpo]) -> UniqueRules {
    let mut merged = UniqueRules::new();
    let mut visited: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();

    for gpo in gpos {
        for (domain, entries) in &gpo.rules {
            let seen = visited.entry(domain.as_str()).or_default();
            for entry in entries {
                if !seen.insert(entry.key.as_str()) {
                    continue;
                }
                merged
                    .entry(domain.clone())
                    .or_default()
                    .insert(entry.key.clone(), entry.clone());
            }
        }
    }

    merged
}

/// Split every domain of `gpos` into winning and overridden entries.
///
/// Each returned element mirrors one GPO, with entries tagged `true` when a
/// higher-precedence GPO already defined the key.
pub fn tag_overridden<'a>(
    gpos: impl IntoIterator<Item = &'a Gpo>,
) -> Vec<BTreeMap<String, Vec<(Entry, bool)>>> {
    let mut visited: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();

    gpos.into_iter()
        .map(|gpo| {
            gpo.rules
                .iter()
                .map(|(domain, entries)| {
                    let seen = visited.entry(domain.as_str()).or_default();
                    let tagged = entries
                        .iter()
                        .map(|e| (e.clone(), !seen.insert(e.key.as_str())))
                        .collect();
                    (domain.clone(), tagged)
                })
                .collect()
        })
        .collect()
}
