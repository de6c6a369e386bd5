//! Integration tests for the continuous watch loop
//!
//! Runs on a paused clock, so every sleep completes instantly and the number
//! of polls inside a window is exact.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use varsnap::config::ENV_ENV;
use varsnap::{Harness, MockSnapStore};

use super::common::{add_snap, development_env, harness};

/// Test that the loop polls once per interval and replays a snap only once
#[tokio::test(start_paused = true)]
async fn test_watch_polls_every_second() {
    let store = Arc::new(MockSnapStore::new().with_snaps(vec![add_snap("abcd", 5)]));
    let harness = harness(development_env(), store.clone());
    let add = harness.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));

    let result = timeout(Duration::from_millis(3500), add.consumer().consume_watch()).await;

    assert!(result.is_err(), "watch loop should run until cancelled");
    assert_eq!(store.fetches().len(), 4);
    assert_eq!(store.trials().len(), 1);
}

/// Test that every registered consumer is watched with the configured interval
#[tokio::test(start_paused = true)]
async fn test_harness_watches_all_consumers() {
    let store = Arc::new(MockSnapStore::new());
    let harness = Harness::builder()
        .env(development_env())
        .store(store.clone())
        .watch_interval(Duration::from_millis(250))
        .build();
    let _add = harness.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));
    let _sub = harness.varsnap("app::sub", |(x, y): (i64, i64)| Ok::<_, String>(x - y));

    let _ = timeout(Duration::from_millis(900), harness.watch()).await;

    let fetches = store.fetches();
    assert_eq!(fetches.len(), 8);
    assert_eq!(
        fetches.iter().filter(|fetch| fetch.signature.ends_with(".app::sub")).count(),
        4
    );
}

/// Test that a disabled consumer does not poll at all
#[tokio::test(start_paused = true)]
async fn test_disabled_watch_returns_immediately() {
    let env = development_env();
    env.set(ENV_ENV, "staging");
    let store = Arc::new(MockSnapStore::new());
    let harness = harness(env, store.clone());
    let add = harness.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));

    let result = timeout(Duration::from_secs(5), add.consumer().consume_watch()).await;

    assert!(result.is_ok());
    assert!(store.fetches().is_empty());
}
