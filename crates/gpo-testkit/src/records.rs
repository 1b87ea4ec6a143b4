//! Registry.pol record builders

use gpo_core::registry::{RegistryData, RegistryRecord};

/// Registry key of `domain/key` in the Ubuntu policy namespace
pub fn policy_key(domain: &str, key: &str) -> String {
    format!(
        r"Software\Policies\Ubuntu\{domain}\{}",
        key.replace('/', "\\")
    )
}

/// Value for every release
pub fn value(domain: &str, key: &str, value: &str) -> RegistryRecord {
    RegistryRecord::new(
        policy_key(domain, key),
        "all",
        RegistryData::String(value.to_string()),
    )
}

/// Value for every release in the `dconf` domain
pub fn dconf(key: &str, v: &str) -> RegistryRecord {
    value("dconf", key, v)
}

/// Explicitly disabled key for every release
pub fn disabled(domain: &str, key: &str) -> RegistryRecord {
    RegistryRecord::new(
        policy_key(domain, key),
        "**del.all",
        RegistryData::String(" ".to_string()),
    )
}

/// Value scoped to one release
pub fn release_value(domain: &str, key: &str, release: &str, value: &str) -> RegistryRecord {
    RegistryRecord::new(
        policy_key(domain, key),
        release,
        RegistryData::String(value.to_string()),
    )
}

/// Disabled key scoped to one release
pub fn release_disabled(domain: &str, key: &str, release: &str) -> RegistryRecord {
    RegistryRecord::new(
        policy_key(domain, key),
        format!("**del.{release}"),
        RegistryData::String(" ".to_string()),
    )
}

/// Override marker enabling or disabling the release scoped value
pub fn override_marker(domain: &str, key: &str, release: &str, enabled: bool) -> RegistryRecord {
    RegistryRecord::new(
        policy_key(domain, key),
        format!("Override{release}"),
        RegistryData::Dword(u32::from(enabled)),
    )
}

/// Record outside the recognized namespace
pub fn foreign(key: &str, value: &str) -> RegistryRecord {
    RegistryRecord::new(
        format!(r"Software\Policies\Microsoft\{key}"),
        "all",
        RegistryData::String(value.to_string()),
    )
}
