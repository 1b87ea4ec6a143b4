//! Kerberos ticket file helpers

use std::fs;
use std::path::{Path, PathBuf};

/// Write a fake user ticket `dir/name` and return its path
pub fn write_ticket(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Write the machine ticket of `ad_domain` into the credential store `sss_dir`
pub fn write_machine_ticket(sss_dir: &Path, ad_domain: &str) -> PathBuf {
    write_ticket(
        sss_dir,
        &format!("ccache_{}", ad_domain.to_uppercase()),
        "KRB5 machine ticket",
    )
}
