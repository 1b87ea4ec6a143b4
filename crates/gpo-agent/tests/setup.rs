//! Resolver construction and runtime directory setup

mod common;

use assert_matches::assert_matches;
use common::*;
use gpo_agent::{PolicyConfig, PolicyResolver};
use gpo_core::PolicyError;
use gpo_effects::FilesystemTransport;
use std::collections::BTreeSet;
use std::sync::Arc;

#[test]
fn test_unwritable_run_dir_fails_setup() {
    let env = TestEnv::new();
    std::fs::create_dir_all(&env.config.run_dir).unwrap();
    std::fs::write(env.config.run_dir.join("krb5cc"), b"not a directory").unwrap();

    let result = PolicyResolver::with_effects(
        &env.config,
        env.directory.clone(),
        Arc::new(FilesystemTransport::default()),
    );
    assert_matches!(result, Err(PolicyError::SetupFailed { .. }));
}

#[test]
fn test_unwritable_cache_dir_fails_setup() {
    let env = TestEnv::new();
    std::fs::create_dir_all(&env.config.cache_dir).unwrap();
    std::fs::write(env.gpo_rules_dir(), b"not a directory").unwrap();

    let result = PolicyResolver::with_effects(
        &env.config,
        env.directory.clone(),
        Arc::new(FilesystemTransport::default()),
    );
    assert_matches!(result, Err(PolicyError::SetupFailed { .. }));
}

#[tokio::test]
async fn test_missing_machine_credential_store() {
    let env = TestEnv::new();
    let config = env
        .config
        .clone()
        .with_sss_cache_dir(env.root.path().join("no-sss"));

    assert_matches!(
        env.resolver_with(&config)
            .get_policies(&ctx(), &machine(), None)
            .await,
        Err(PolicyError::CredentialUnavailable { .. })
    );
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let env = TestEnv::new();
    let config = PolicyConfig {
        ad_domain: String::new(),
        ..env.config.clone()
    };

    let result = PolicyResolver::with_effects(
        &config,
        env.directory.clone(),
        Arc::new(FilesystemTransport::default()),
    );
    assert_matches!(result, Err(PolicyError::Configuration { field, .. }) if field == "ad_domain");
}

#[test]
fn test_resolver_reports_configured_identity() {
    let env = TestEnv::new();
    let resolver = env.resolver();
    assert_eq!(resolver.hostname(), HOSTNAME);
    assert_eq!(resolver.release(), RELEASE);
    assert_eq!(resolver.machine_identity().unwrap(), machine());
}

#[tokio::test]
async fn test_fresh_resolver_has_no_active_users() {
    let env = TestEnv::new();
    let resolver = env.resolver();

    assert!(env.config.run_dir.join("krb5cc").is_dir());
    assert!(env.gpo_rules_dir().is_dir());
    assert_eq!(resolver.list_active_users().await.unwrap(), BTreeSet::new());
}
