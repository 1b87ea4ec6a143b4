//! Offline fallback to the last known good resolution

mod common;

use assert_matches::assert_matches;
use common::*;
use gpo_agent::RequestContext;
use gpo_core::{Entry, PolicyError};
use std::time::Duration;

#[tokio::test]
async fn test_offline_serves_cached_resolution() {
    let env = TestEnv::new();
    env.directory.answer("bob", &["one-value", "standard"]);
    let resolver = env.resolver();
    let ticket = env.user_ticket("bob");

    let online = resolver
        .get_policies(&ctx(), &user("bob"), Some(&ticket))
        .await
        .unwrap();
    assert!(!online.is_offline);

    env.directory.go_offline();
    let offline = resolver
        .get_policies(&ctx(), &user("bob"), Some(&ticket))
        .await
        .unwrap();
    assert!(offline.is_offline);
    assert_eq!(offline.gpos, online.gpos);
}

#[tokio::test]
async fn test_offline_without_cache_is_unreachable() {
    let env = TestEnv::new();
    env.directory.go_offline();

    assert_matches!(
        env.resolver()
            .get_policies(&ctx(), &user("useroffline"), Some(&env.user_ticket("useroffline")))
            .await,
        Err(PolicyError::DirectoryUnreachable { identity }) if identity == "useroffline@EXAMPLE.COM"
    );
    assert_matches!(
        env.resolver().get_policies(&ctx(), &machine(), None).await,
        Err(PolicyError::DirectoryUnreachable { .. })
    );
}

#[tokio::test]
async fn test_failed_resolution_keeps_last_good_record() {
    let env = TestEnv::new();
    let resolver = env.resolver();
    let ticket = env.user_ticket("bob");

    env.directory.answer("bob", &["one-value"]);
    let good = resolver
        .get_policies(&ctx(), &user("bob"), Some(&ticket))
        .await
        .unwrap();

    env.directory.answer("bob", &["standard", "corrupted-policy"]);
    assert_matches!(
        resolver.get_policies(&ctx(), &user("bob"), Some(&ticket)).await,
        Err(PolicyError::CorruptSource { .. })
    );

    env.directory.go_offline();
    let offline = resolver
        .get_policies(&ctx(), &user("bob"), None)
        .await
        .unwrap();
    assert!(offline.is_offline);
    assert_eq!(offline.gpos, good.gpos);
    assert_eq!(
        offline.gpos,
        vec![dconf("one-value", vec![Entry::new("C", "oneValueC")])]
    );
}

#[tokio::test]
async fn test_query_deadline_falls_back_to_cache() {
    let env = TestEnv::new();
    env.directory.answer("bob", &["standard"]);
    let resolver = env.resolver();
    let ticket = env.user_ticket("bob");

    let online = resolver
        .get_policies(&ctx(), &user("bob"), Some(&ticket))
        .await
        .unwrap();

    env.directory.set_delay(Duration::from_secs(30));
    let bounded = RequestContext::with_timeout(Duration::from_millis(50));
    let resolution = resolver
        .get_policies(&bounded, &user("bob"), Some(&ticket))
        .await
        .unwrap();
    assert!(resolution.is_offline);
    assert_eq!(resolution.gpos, online.gpos);
}

#[tokio::test]
async fn test_cancelled_resolution_does_not_overwrite_cache() {
    let env = TestEnv::new();
    let resolver = env.resolver();
    let ticket = env.user_ticket("bob");

    env.directory.answer("bob", &["one-value"]);
    let good = resolver
        .get_policies(&ctx(), &user("bob"), Some(&ticket))
        .await
        .unwrap();

    env.directory.answer("bob", &["standard"]);
    env.directory.set_delay(Duration::from_secs(30));
    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        resolver.get_policies(&ctx(), &user("bob"), Some(&ticket)),
    )
    .await;
    assert!(cancelled.is_err());

    env.directory.set_delay(Duration::ZERO);
    env.directory.go_offline();
    let offline = resolver
        .get_policies(&ctx(), &user("bob"), None)
        .await
        .unwrap();
    assert_eq!(offline.gpos, good.gpos);
}
