//! Concurrent resolutions

mod common;

use common::*;
use gpo_core::Entry;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_identities_resolve_independently() {
    let env = TestEnv::new();
    let answers: [(&str, &[&str]); 4] = [
        ("bob", &["one-value"]),
        ("alice", &["standard"]),
        ("carol", &["disabled-value", "standard"]),
        ("dave", &["multiple-releases"]),
    ];
    for (name, objects) in answers {
        env.directory.answer(name, objects);
    }
    env.directory.set_delay(Duration::from_millis(20));
    let resolver = Arc::new(env.resolver());

    let tasks: Vec<_> = answers
        .iter()
        .map(|(name, _)| {
            let resolver = resolver.clone();
            let identity = user(name);
            let ticket = env.user_ticket(name);
            tokio::spawn(async move {
                resolver
                    .get_policies(&ctx(), &identity, Some(&ticket))
                    .await
                    .map(|r| r.unique_rules())
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap().unwrap());
    }

    assert_eq!(results[0]["dconf"]["C"], Entry::new("C", "oneValueC"));
    assert_eq!(results[1]["dconf"]["C"], Entry::new("C", "standardC"));
    assert_eq!(results[2]["dconf"]["C"], Entry::disabled("C"));
    assert_eq!(results[2]["dconf"]["A"], Entry::new("A", "standardA"));
    assert_eq!(results[3]["dconf"]["A"], Entry::new("A", "21.04Value"));
    assert!(!results[0]["dconf"].contains_key("A"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_identity_concurrent_writes_stay_consistent() {
    let env = TestEnv::new();
    env.directory.answer("bob", &["one-value", "standard"]);
    let resolver = Arc::new(env.resolver());
    let ticket = env.user_ticket("bob");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            let ticket = ticket.clone();
            tokio::spawn(async move {
                resolver
                    .get_policies(&ctx(), &user("bob"), Some(&ticket))
                    .await
            })
        })
        .collect();

    let mut resolutions = Vec::new();
    for task in tasks {
        resolutions.push(task.await.unwrap().unwrap());
    }
    assert!(resolutions.windows(2).all(|w| w[0] == w[1]));

    env.directory.go_offline();
    let cached = resolver
        .get_policies(&ctx(), &user("bob"), None)
        .await
        .unwrap();
    assert_eq!(cached.gpos, resolutions[0].gpos);

    let leftovers: Vec<_> = std::fs::read_dir(env.gpo_rules_dir())
        .unwrap()
        .flatten()
        .map(|e| e.file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("bob@EXAMPLE.COM")]);
}
