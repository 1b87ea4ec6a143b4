//! Shared setup for resolver scenario tests
#![allow(dead_code)]

use gpo_agent::{PolicyConfig, PolicyResolver, RequestContext};
use gpo_core::{Entry, Gpo, Identity};
use gpo_effects::FilesystemTransport;
use gpo_testkit::{
    write_machine_ticket, write_ticket, DelayedTransport, ScriptedDirectory, SysvolFixture,
    SYSVOL_LOCATION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const HOSTNAME: &str = "ws-042";
pub const AD_DOMAIN: &str = "example.com";
pub const RELEASE: &str = "21.04";

/// Isolated cache, run and credential directories plus a standard SYSVOL
pub struct TestEnv {
    pub root: TempDir,
    pub sysvol: SysvolFixture,
    pub directory: Arc<ScriptedDirectory>,
    pub transport: Arc<DelayedTransport>,
    pub config: PolicyConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_release(RELEASE)
    }

    pub fn with_release(release: &str) -> Self {
        let root = TempDir::new().unwrap();
        let sss = root.path().join("sss");
        write_machine_ticket(&sss, AD_DOMAIN);

        let sysvol = SysvolFixture::with_standard_objects();
        let config = PolicyConfig::new("ldap://adc.example.com", AD_DOMAIN)
            .with_cache_dir(root.path().join("cache"))
            .with_run_dir(root.path().join("run"))
            .with_sss_cache_dir(sss)
            .with_sysvol_mount(sysvol.mount_root())
            .with_hostname(HOSTNAME)
            .with_release(release);

        let transport = Arc::new(DelayedTransport::new(Arc::new(FilesystemTransport::new(
            config.sysvol_mount.clone(),
        ))));

        Self {
            root,
            sysvol,
            directory: Arc::new(ScriptedDirectory::new(SYSVOL_LOCATION)),
            transport,
            config,
        }
    }

    pub fn resolver(&self) -> PolicyResolver {
        self.resolver_with(&self.config)
    }

    pub fn resolver_with(&self, config: &PolicyConfig) -> PolicyResolver {
        PolicyResolver::with_effects(config, self.directory.clone(), self.transport.clone())
            .unwrap()
    }

    /// Fresh user ticket file outside the run directory
    pub fn user_ticket(&self, user: &str) -> PathBuf {
        write_ticket(
            &self.root.path().join("tickets"),
            &format!("krb5cc_{user}"),
            &format!("KRB5 ticket of {user}"),
        )
    }

    pub fn gpo_rules_dir(&self) -> PathBuf {
        self.config.cache_dir.join("gpo_rules")
    }
}

pub fn ctx() -> RequestContext {
    RequestContext::new()
}

pub fn user(name: &str) -> Identity {
    Identity::user(&format!("{name}@{}", AD_DOMAIN.to_uppercase())).unwrap()
}

pub fn machine() -> Identity {
    Identity::computer(HOSTNAME).unwrap()
}

/// GPO as resolved from the fixture share
pub fn gpo(id: &str, domains: &[(&str, Vec<Entry>)]) -> Gpo {
    domains
        .iter()
        .fold(Gpo::new(id, format!("{id}-name")), |gpo, (domain, entries)| {
            gpo.with_domain(*domain, entries.clone())
        })
}

pub fn dconf(id: &str, entries: Vec<Entry>) -> Gpo {
    gpo(id, &[("dconf", entries)])
}
