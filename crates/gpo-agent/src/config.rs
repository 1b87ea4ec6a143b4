//! Resolver configuration
//!
//! Loaded from TOML (or JSON) and validated before any store is created.
//! Every directory is configurable so that isolated resolvers can run side
//! by side in tests.

use gpo_core::parser::DEFAULT_DISTRO;
use gpo_core::{PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the download cache and resolution records
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/gpo";
/// Default location of private ticket copies
pub const DEFAULT_RUN_DIR: &str = "/run/gpo";
/// Default machine credential store
pub const DEFAULT_SSS_CACHE_DIR: &str = "/var/lib/sss/db";
/// File the current release is detected from
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Configuration of a [`crate::PolicyResolver`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Download cache and resolution records
    pub cache_dir: PathBuf,
    /// Private ticket copies live under `<run_dir>/krb5cc`
    pub run_dir: PathBuf,
    /// Directory server, e.g. `ldap://adc.example.com`
    pub ad_server: String,
    /// Directory domain, e.g. `example.com`
    pub ad_domain: String,
    /// Release multi-release overrides are resolved for; detected when unset
    pub release: Option<String>,
    /// Distribution whose policy keys are recognized
    pub distro: String,
    /// Machine credential store
    pub sss_cache_dir: PathBuf,
    /// Local hostname; detected when unset
    pub hostname: Option<String>,
    /// Listing command, program first
    pub gpo_list_cmd: Vec<String>,
    /// Root where `smb://` shares are mounted
    pub sysvol_mount: Option<PathBuf>,
    /// Concurrent object downloads per resolution
    pub max_concurrent_downloads: usize,
    /// Directory query deadline, in milliseconds
    pub query_timeout_ms: u64,
    /// Per-object download deadline, in milliseconds
    pub download_timeout_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
            ad_server: String::new(),
            ad_domain: String::new(),
            release: None,
            distro: DEFAULT_DISTRO.to_string(),
            sss_cache_dir: PathBuf::from(DEFAULT_SSS_CACHE_DIR),
            hostname: None,
            gpo_list_cmd: vec!["gpo-list".to_string()],
            sysvol_mount: None,
            max_concurrent_downloads: 4,
            query_timeout_ms: 30_000,
            download_timeout_ms: 30_000,
        }
    }
}

impl PolicyConfig {
    /// Configuration for a directory server and domain, with defaults elsewhere
    pub fn new(ad_server: impl Into<String>, ad_domain: impl Into<String>) -> Self {
        Self {
            ad_server: ad_server.into(),
            ad_domain: ad_domain.into(),
            ..Self::default()
        }
    }

    /// Set the cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the run directory
    pub fn with_run_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.run_dir = dir.into();
        self
    }

    /// Set the current release
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Set the recognized distribution
    pub fn with_distro(mut self, distro: impl Into<String>) -> Self {
        self.distro = distro.into();
        self
    }

    /// Set the machine credential store
    pub fn with_sss_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sss_cache_dir = dir.into();
        self
    }

    /// Set the local hostname
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the listing command
    pub fn with_gpo_list_cmd(mut self, cmd: Vec<String>) -> Self {
        self.gpo_list_cmd = cmd;
        self
    }

    /// Set the share mount root
    pub fn with_sysvol_mount(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sysvol_mount = Some(dir.into());
        self
    }

    /// Set the download concurrency
    pub fn with_max_concurrent_downloads(mut self, n: usize) -> Self {
        self.max_concurrent_downloads = n;
        self
    }

    /// Set the directory query deadline
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = millis(timeout);
        self
    }

    /// Set the per-object download deadline
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout_ms = millis(timeout);
        self
    }

    /// Directory query deadline
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Per-object download deadline
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    /// Load and validate a `.toml` or `.json` configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::configuration(path.display().to_string(), e.to_string()))?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| PolicyError::configuration("file", format!("invalid JSON: {e}")))?,
            _ => toml::from_str(&content)
                .map_err(|e| PolicyError::configuration("file", format!("invalid TOML: {e}")))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject incomplete or inconsistent settings
    pub fn validate(&self) -> Result<()> {
        if self.ad_server.trim().is_empty() {
            return Err(PolicyError::configuration("ad_server", "cannot be empty"));
        }
        if self.ad_domain.trim().is_empty() {
            return Err(PolicyError::configuration("ad_domain", "cannot be empty"));
        }
        if self.distro.trim().is_empty() {
            return Err(PolicyError::configuration("distro", "cannot be empty"));
        }
        if self.gpo_list_cmd.first().map_or(true, |p| p.is_empty()) {
            return Err(PolicyError::configuration("gpo_list_cmd", "no program given"));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(PolicyError::configuration(
                "max_concurrent_downloads",
                "must be at least 1",
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(PolicyError::configuration("query_timeout_ms", "cannot be 0"));
        }
        if self.download_timeout_ms == 0 {
            return Err(PolicyError::configuration("download_timeout_ms", "cannot be 0"));
        }
        for (field, dir) in [
            ("cache_dir", &self.cache_dir),
            ("run_dir", &self.run_dir),
            ("sss_cache_dir", &self.sss_cache_dir),
        ] {
            if !dir.is_absolute() {
                return Err(PolicyError::configuration(field, "must be an absolute path"));
            }
        }
        if let Some(hostname) = &self.hostname {
            if hostname.is_empty() {
                return Err(PolicyError::configuration("hostname", "cannot be empty"));
            }
        }
        Ok(())
    }
}

/// Whole milliseconds, rounded up so that a non-zero timeout stays non-zero
fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Read `VERSION_ID` from an os-release file
pub fn detect_release(os_release: &Path) -> Result<String> {
    let content = std::fs::read_to_string(os_release).map_err(|e| {
        PolicyError::configuration("release", format!("{}: {e}", os_release.display()))
    })?;
    parse_version_id(&content).ok_or_else(|| {
        PolicyError::configuration(
            "release",
            format!("no VERSION_ID in {}", os_release.display()),
        )
    })
}

fn parse_version_id(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let value = line.trim().strip_prefix("VERSION_ID=")?;
        let value = value.trim().trim_matches('"').trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}
