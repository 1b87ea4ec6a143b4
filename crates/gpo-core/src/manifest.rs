//! GPT.INI manifest reader
//!
//! Every policy object carries a `GPT.INI` with a `[General]` section and a
//! numeric `Version`. Anything else in the file is ignored.

/// Parsed GPT.INI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Object version as published by the directory
    pub version: u32,
    /// Optional display name
    pub display_name: Option<String>,
}

/// Failure to read a manifest
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// No `[General]` section
    #[error("missing [General] section")]
    MissingGeneral,

    /// No `Version` key in `[General]`
    #[error("missing Version in [General]")]
    MissingVersion,

    /// `Version` is not a number
    #[error("invalid Version {0:?}")]
    InvalidVersion(String),

    /// A line is neither a section, a key or a comment
    #[error("unparsable line {line}: {content:?}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// Offending line
        content: String,
    },
}

/// Parse GPT.INI text
pub fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut in_general = false;
    let mut seen_general = false;
    let mut version = None;
    let mut display_name = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_general = section.trim().eq_ignore_ascii_case("general");
            seen_general |= in_general;
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| ManifestError::Malformed {
            line: idx + 1,
            content: line.to_string(),
        })?;
        if !in_general {
            continue;
        }

        let (key, value) = (key.trim(), value.trim());
        if key.eq_ignore_ascii_case("version") {
            let parsed = value
                .parse::<u32>()
                .map_err(|_| ManifestError::InvalidVersion(value.to_string()))?;
            version = Some(parsed);
        } else if key.eq_ignore_ascii_case("displayname") && !value.is_empty() {
            display_name = Some(value.to_string());
        }
    }

    if !seen_general {
        return Err(ManifestError::MissingGeneral);
    }

    Ok(Manifest {
        version: version.ok_or(ManifestError::MissingVersion)?,
        display_name,
    })
}
