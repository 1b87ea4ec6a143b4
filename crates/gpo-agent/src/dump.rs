//! Human-readable listing of cached resolutions

use gpo_core::merge::tag_overridden;
use gpo_core::Gpo;

/// A titled run of GPOs, in precedence order
pub(crate) struct Section<'a> {
    pub title: Option<&'static str>,
    pub gpos: &'a [Gpo],
}

/// Render `sections` as one listing.
///
/// Precedence runs across sections: the first section overrides the next.
pub(crate) fn render(sections: &[Section<'_>], with_rules: bool, with_overridden: bool) -> String {
    let mut tags = tag_overridden(sections.iter().flat_map(|s| s.gpos.iter())).into_iter();
    let mut lines = Vec::new();

    for section in sections {
        if let Some(title) = section.title {
            lines.push(title.to_string());
        }
        for gpo in section.gpos {
            let domains = tags.next().unwrap_or_default();
            lines.push(format!("* {} ({})", gpo.name, gpo.id));
            if !with_rules {
                continue;
            }

            for (domain, entries) in domains {
                let visible: Vec<_> = entries
                    .into_iter()
                    .filter(|(_, overridden)| with_overridden || !overridden)
                    .collect();
                if visible.is_empty() {
                    continue;
                }
                lines.push(format!("** {domain}:"));
                for (entry, overridden) in visible {
                    let mut line = if entry.disabled {
                        format!("*** {} (disabled)", entry.key)
                    } else {
                        format!("*** {}: {}", entry.key, entry.value)
                    };
                    if overridden {
                        line.push_str(" (overridden)");
                    }
                    lines.push(line);
                }
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpo_core::Entry;

    fn sample() -> (Vec<Gpo>, Vec<Gpo>) {
        let machine = vec![Gpo::new("m1", "Machine policy")
            .with_domain("dconf", vec![Entry::new("C", "machine")])];
        let user = vec![Gpo::new("u1", "User policy").with_domain(
            "dconf",
            vec![Entry::new("C", "user"), Entry::disabled("D")],
        )];
        (machine, user)
    }

    #[test]
    fn test_names_only() {
        let (machine, user) = sample();
        let out = render(
            &[
                Section { title: Some("Machine:"), gpos: &machine },
                Section { title: Some("User:"), gpos: &user },
            ],
            false,
            false,
        );
        assert_eq!(out, "Machine:\n* Machine policy (m1)\nUser:\n* User policy (u1)\n");
    }

    #[test]
    fn test_overridden_rules_hidden_unless_requested() {
        let (machine, user) = sample();
        let sections = [
            Section { title: None, gpos: &machine },
            Section { title: None, gpos: &user },
        ];

        let hidden = render(&sections, true, false);
        assert!(hidden.contains("*** C: machine"));
        assert!(!hidden.contains("*** C: user"));
        assert!(hidden.contains("*** D (disabled)"));

        let shown = render(&sections, true, true);
        assert!(shown.contains("*** C: user (overridden)"));
    }
}
