//! On-disk SYSVOL fixture
//!
//! Objects are written under `<root>/SYSVOL/example.com/Policies/<id>` and
//! are reachable at `smb://localhost/SYSVOL/example.com/Policies/<id>` once
//! the transport mounts `<root>`.

use crate::records::*;
use gpo_core::registry::{encode, RegistryRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Location prefix of fixture objects
pub const SYSVOL_LOCATION: &str = "smb://localhost/SYSVOL/example.com/Policies";

/// Release the multi-release fixtures target
pub const FIXTURE_RELEASE: &str = "21.04";

/// Temporary SYSVOL share
pub struct SysvolFixture {
    root: TempDir,
}

impl SysvolFixture {
    /// Empty share
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create sysvol root"),
        }
    }

    /// Share holding every standard object, see [`SysvolFixture::write_standard_objects`]
    pub fn with_standard_objects() -> Self {
        let fixture = Self::new();
        fixture.write_standard_objects();
        fixture
    }

    /// Root to use as the transport share mount
    pub fn mount_root(&self) -> &Path {
        self.root.path()
    }

    /// Network location of `id`
    pub fn location(&self, id: &str) -> String {
        format!("{SYSVOL_LOCATION}/{id}")
    }

    /// Local directory of `id`
    pub fn object_dir(&self, id: &str) -> PathBuf {
        self.root
            .path()
            .join("SYSVOL/example.com/Policies")
            .join(id)
    }

    /// Write an object with a manifest and optional class documents
    pub fn write_object(
        &self,
        id: &str,
        user: Option<&[RegistryRecord]>,
        machine: Option<&[RegistryRecord]>,
    ) {
        let dir = self.object_dir(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("GPT.INI"),
            format!("[General]\r\nVersion=1\r\ndisplayName={id}-name\r\n"),
        )
        .unwrap();
        if let Some(records) = user {
            self.write_file(id, "User/Registry.pol", &encode(records));
        }
        if let Some(records) = machine {
            self.write_file(id, "Machine/Registry.pol", &encode(records));
        }
    }

    /// Write an object with the same document for both classes
    pub fn write_both(&self, id: &str, records: &[RegistryRecord]) {
        self.write_object(id, Some(records), Some(records));
    }

    /// Write raw bytes at `rel` inside object `id`
    pub fn write_file(&self, id: &str, rel: &str, bytes: &[u8]) {
        let path = self.object_dir(id).join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, bytes).unwrap();
    }

    /// Remove `rel` inside object `id`
    pub fn remove_file(&self, id: &str, rel: &str) {
        fs::remove_file(self.object_dir(id).join(rel)).unwrap();
    }

    /// Write the standard objects:
    ///
    /// | id | user | machine |
    /// |----|------|---------|
    /// | `standard` | `A=standardA`, `C=standardC` | `A=machStandardA`, `C=machStandardC` |
    /// | `one-value` | `C=oneValueC` | `C=oneValueC` |
    /// | `disabled-value` | `C` disabled | `C` disabled |
    /// | `user-only` | `C=userOnlyC` | none |
    /// | `machine-only` | none | `C=machOnlyC` |
    /// | `multiple-domains` | dconf and `other` domains | same |
    /// | `filtered` | `C=filteredC` plus a foreign key | same |
    /// | `multiple-releases` | `A` for all, `A` for 21.04 enabled | same |
    /// | `multiple-releases-one-disabled` | as above with the 21.04 marker off | same |
    /// | `multiple-releases-one-deleted` | `A` for all, `A` disabled for 21.04 | same |
    /// | `corrupted-policy` | unparsable Registry.pol | same |
    /// | `no-gpt-ini` | `C=noGptIniC` without GPT.INI | same |
    ///
    /// All values live in the `dconf` domain unless stated otherwise.
    pub fn write_standard_objects(&self) {
        self.write_object(
            "standard",
            Some(&[dconf("A", "standardA"), dconf("C", "standardC")]),
            Some(&[dconf("A", "machStandardA"), dconf("C", "machStandardC")]),
        );
        self.write_both("one-value", &[dconf("C", "oneValueC")]);
        self.write_both("disabled-value", &[disabled("dconf", "C")]);
        self.write_object("user-only", Some(&[dconf("C", "userOnlyC")]), None);
        self.write_object("machine-only", None, Some(&[dconf("C", "machOnlyC")]));
        self.write_both(
            "multiple-domains",
            &[
                dconf("C", "dconfC"),
                value("other", "C", "otherC"),
                dconf("org/gnome/desktop/background/picture-uri", "file:///bg.png"),
            ],
        );
        self.write_both(
            "filtered",
            &[dconf("C", "filteredC"), foreign(r"Windows\Explorer\C", "windows")],
        );
        self.write_both(
            "multiple-releases",
            &[
                dconf("A", "AllValue"),
                release_value("dconf", "A", FIXTURE_RELEASE, "21.04Value"),
                override_marker("dconf", "A", FIXTURE_RELEASE, true),
            ],
        );
        self.write_both(
            "multiple-releases-one-disabled",
            &[
                dconf("A", "AllValue"),
                release_value("dconf", "A", FIXTURE_RELEASE, "21.04Value"),
                override_marker("dconf", "A", FIXTURE_RELEASE, false),
            ],
        );
        self.write_both(
            "multiple-releases-one-deleted",
            &[
                dconf("A", "AllValue"),
                release_disabled("dconf", "A", FIXTURE_RELEASE),
                override_marker("dconf", "A", FIXTURE_RELEASE, true),
            ],
        );

        self.write_object("corrupted-policy", None, None);
        self.write_file("corrupted-policy", "User/Registry.pol", b"PReg\x01\0\0\0[garbage");
        self.write_file("corrupted-policy", "Machine/Registry.pol", b"not a registry file");

        self.write_both("no-gpt-ini", &[dconf("C", "noGptIniC")]);
        self.remove_file("no-gpt-ini", "GPT.INI");
    }
}

impl Default for SysvolFixture {
    fn default() -> Self {
        Self::new()
    }
}
