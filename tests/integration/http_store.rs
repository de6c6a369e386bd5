//! Integration tests for the HTTP snap store
//!
//! Tests the flow: HttpSnapStore -> form POST -> fake service -> JSON response

use std::sync::Arc;

use varsnap::config::ENV_API_URL;
use varsnap::store::{ConsumeRequest, ProduceSnapRequest, ProduceTrialRequest};
use varsnap::{ConsumeResult, Harness, HttpSnapStore, Settings, SnapStore, StaticEnv, StoreError};

use super::common::{add_snap, development_env, FakeStore, CONSUMER_TOKEN};

fn store_for(url: &str) -> HttpSnapStore {
    let env = StaticEnv::new().with(ENV_API_URL, url);
    HttpSnapStore::new(&Settings::load(&env))
}

fn consume_request() -> ConsumeRequest {
    ConsumeRequest {
        consumer_token: CONSUMER_TOKEN.into(),
        signature: "rust.0.2.0.app::add".into(),
    }
}

/// Test that fetched snaps are parsed and the request is form encoded
#[tokio::test]
async fn test_fetch_snaps_round_trip() {
    let fake = FakeStore::start().await;
    fake.set_snaps(vec![add_snap("abcd", 5)]);
    let store = store_for(&fake.url());

    let response = store
        .fetch_snaps(consume_request())
        .await
        .expect("fetch should succeed");

    assert!(response.is_ok());
    assert_eq!(response.results, vec![add_snap("abcd", 5)]);
    let fetches = fake.fetches();
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0]["consumer_token"], CONSUMER_TOKEN);
    assert_eq!(fetches[0]["signature"], "rust.0.2.0.app::add");
}

/// Test that snap submissions carry all four fields
#[tokio::test]
async fn test_produce_snap_posts_form() {
    let fake = FakeStore::start().await;
    let store = store_for(&fake.url());

    store
        .produce_snap(ProduceSnapRequest {
            producer_token: "p".into(),
            signature: "s".into(),
            inputs: "aW5wdXRz".into(),
            prod_outputs: "b3V0cHV0cw==".into(),
        })
        .await
        .expect("produce should succeed");

    let produced = fake.produced();
    assert_eq!(produced.len(), 1);
    assert_eq!(produced[0]["prod_outputs"], "b3V0cHV0cw==");
    assert_eq!(produced[0].len(), 4);
}

/// Test that the trial URL is read back from the response
#[tokio::test]
async fn test_produce_trial_returns_url() {
    let fake = FakeStore::start().await;
    fake.set_trial_url("https://www.varsnap.com/trial/42/");
    let store = store_for(&fake.url());

    let response = store
        .produce_trial(ProduceTrialRequest {
            consumer_token: CONSUMER_TOKEN.into(),
            snap_id: "abcd".into(),
            dev_outputs: "x".into(),
            matches: true,
        })
        .await
        .expect("trial should succeed");

    assert!(response.is_ok());
    assert_eq!(response.trial_url.as_deref(), Some("https://www.varsnap.com/trial/42/"));
    assert_eq!(fake.trials()[0]["matches"], "true");
}

/// Test that a body that is not JSON is reported as malformed
#[tokio::test]
async fn test_malformed_response_is_classified() {
    let fake = FakeStore::start().await;
    fake.set_consume_body("<html>oops</html>");
    let store = store_for(&fake.url());

    let err = store.fetch_snaps(consume_request()).await.unwrap_err();
    assert!(matches!(err, StoreError::Malformed(_)), "got {err:?}");
}

/// Test that an unreachable service surfaces as a transport error
#[tokio::test]
async fn test_unreachable_store_is_http_error() {
    let store = store_for("http://127.0.0.1:1");
    let err = store.fetch_snaps(consume_request()).await.unwrap_err();
    assert!(matches!(err, StoreError::Http(_)), "got {err:?}");
}

/// Test a full replay against the fake service
#[tokio::test]
async fn test_consumer_replays_over_http() {
    let fake = FakeStore::start().await;
    fake.set_snaps(vec![add_snap("abcd", 5)]);
    fake.set_trial_url("https://www.varsnap.com/trial/abcd/");

    let env = development_env();
    env.set(ENV_API_URL, fake.url());
    let store: Arc<dyn SnapStore> = Arc::new(HttpSnapStore::new(&Settings::load(env.as_ref())));
    let harness = Harness::builder().env(env).store(store).build();
    let add = harness.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));

    let ConsumeResult::Replayed { matched, report } = add.consumer().consume().await else {
        panic!("expected a replay");
    };

    assert!(matched, "report:\n{report}");
    assert!(report.lines().next().unwrap_or_default().ends_with("/trial/abcd/"));
    let trials = fake.trials();
    assert_eq!(trials.len(), 1);
    assert_eq!(trials[0]["snap_id"], "abcd");
    assert_eq!(trials[0]["consumer_token"], CONSUMER_TOKEN);
}

/// Test that a failing service leaves the consumer idle
#[tokio::test]
async fn test_consumer_is_idle_when_service_is_down() {
    let env = development_env();
    env.set(ENV_API_URL, "http://127.0.0.1:1");
    let store: Arc<dyn SnapStore> = Arc::new(HttpSnapStore::new(&Settings::load(env.as_ref())));
    let harness = Harness::builder().env(env).store(store).build();
    let add = harness.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));

    assert_eq!(add.consumer().consume().await, ConsumeResult::Idle);
}
