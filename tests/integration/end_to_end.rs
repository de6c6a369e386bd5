//! Integration tests for the record and replay flow
//!
//! Tests the flow: snap in store -> Consumer -> local replay -> comparison -> report

use std::sync::Arc;

use parking_lot::Mutex;
use varsnap::report::{LABEL_DEV_OUTPUTS, LABEL_EXCEPTION, LABEL_KWARGS, LABEL_PROD_OUTPUTS};
use varsnap::store::MockTrial;
use varsnap::{ConsumeResult, MockSnapStore, Snap, Value};

use super::common::{add_snap, development_env, harness, production_env, snap_of};

fn line_value<'a>(report: &'a str, label: &str) -> &'a str {
    report
        .lines()
        .find(|line| line.starts_with(label))
        .map(|line| line[label.len()..].trim())
        .unwrap_or_else(|| panic!("no {label} line in:\n{report}"))
}

/// Test that a matching replay reports success and calls the function once
#[tokio::test]
async fn test_matching_replay_invokes_target_once() {
    let store = Arc::new(MockSnapStore::new().with_snaps(vec![add_snap("abcd", 5)]));
    let harness = harness(development_env(), store.clone());
    let calls = Arc::new(Mutex::new(Vec::new()));

    let seen = calls.clone();
    let add = harness.varsnap("app::add", move |(x, y): (i64, i64)| {
        seen.lock().push((x, y));
        Ok::<_, String>(x + y)
    });

    let (matched, report) = add.consumer().consume().await.into_pair();

    assert!(matched, "report:\n{report}");
    assert_eq!(*calls.lock(), vec![(2, 3)]);
    assert_eq!(line_value(&report, LABEL_PROD_OUTPUTS), "5");
    assert_eq!(line_value(&report, LABEL_DEV_OUTPUTS), "5");
    assert!(!report.contains(LABEL_EXCEPTION));

    let trials = store.trials();
    assert_eq!(trials.len(), 1);
    assert!(trials[0].matches);
    assert_eq!(trials[0].snap_id, "abcd");
}

/// Test that a changed implementation is reported with both outputs
#[tokio::test]
async fn test_mismatch_report_contains_both_outputs() {
    let store = Arc::new(MockSnapStore::new().with_snaps(vec![add_snap("abcd", 5)]));
    let harness = harness(development_env(), store.clone());
    let add = harness.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y + 1));

    let (matched, report) = add.consumer().consume().await.into_pair();

    assert!(!matched);
    assert_eq!(line_value(&report, LABEL_PROD_OUTPUTS), "5");
    assert_eq!(line_value(&report, LABEL_DEV_OUTPUTS), "6");
    assert!(!store.trials()[0].matches);
}

/// Test that the most recent snap is not replayed again on the next poll
#[tokio::test]
async fn test_consecutive_polls_skip_seen_snap() {
    let store = Arc::new(MockSnapStore::new().with_snaps(vec![add_snap("abcd", 5)]));
    let harness = harness(development_env(), store);
    let calls = Arc::new(Mutex::new(0));

    let counter = calls.clone();
    let add = harness.varsnap("app::add", move |(x, y): (i64, i64)| {
        *counter.lock() += 1;
        Ok::<_, String>(x + y)
    });

    assert!(!add.consumer().consume().await.is_idle());
    assert_eq!(add.consumer().consume().await, ConsumeResult::Idle);
    assert_eq!(*calls.lock(), 1);
}

/// Test that undecodable snaps are skipped without affecting the verdict
#[tokio::test]
async fn test_malformed_snaps_are_skipped() {
    let store = Arc::new(MockSnapStore::new().with_snaps(vec![
        Snap::new("bad", "abc!", "abc!"),
        add_snap("good", 5),
    ]));
    let harness = harness(development_env(), store.clone());
    let add = harness.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));

    let ConsumeResult::Replayed { matched, report } = add.consumer().consume().await else {
        panic!("expected the good snap to be replayed");
    };
    assert!(matched);
    assert!(!report.contains("\n\n"));
    assert_eq!(store.trials().len(), 1);
    assert_eq!(add.consumer().last_snap_id().as_deref(), Some("good"));
}

/// Test that a recorded error matches the same local error
#[tokio::test]
async fn test_errors_are_compared_as_data() {
    let raised = Value::raised(Value::text("division by zero"));
    let store = Arc::new(MockSnapStore::new().with_snaps(vec![
        snap_of("err", &(1i64, 0i64), &raised),
        snap_of("val", &(1i64, 0i64), &0i64),
    ]));
    let harness = harness(development_env(), store.clone());
    let divide = harness.varsnap("app::divide", |(x, y): (i64, i64)| {
        if y == 0 {
            Err("division by zero".to_string())
        } else {
            Ok(x / y)
        }
    });

    let (matched, report) = divide.consumer().consume().await.into_pair();

    // The first snap matches; the second recorded a value where we now fail.
    assert!(!matched);
    let reports: Vec<&str> = report.split("\n\n").collect();
    assert_eq!(reports.len(), 2);
    assert!(reports[0].contains(LABEL_EXCEPTION));
    assert_eq!(line_value(reports[0], LABEL_EXCEPTION), "division by zero");
    let verdicts: Vec<bool> = store.trials().iter().map(|trial| trial.matches).collect();
    assert_eq!(verdicts, vec![true, false]);
}

/// Test that calls recorded by a producer replay cleanly on a consumer
#[tokio::test]
async fn test_recorded_calls_replay_against_same_function() {
    let store = Arc::new(MockSnapStore::new());

    let production = harness(production_env(), store.clone());
    let add = production.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));
    assert_eq!(add.call((2, 3)), Ok(5));
    assert_eq!(add.call((10, -4)), Ok(6));
    production.flush().await;
    assert_eq!(store.promote_produced().len(), 2);

    let development = harness(development_env(), store.clone());
    let add = development.varsnap("app::add", |(x, y): (i64, i64)| Ok::<_, String>(x + y));
    let (matched, report) = add.consumer().consume().await.into_pair();

    assert!(matched, "report:\n{report}");
    assert_eq!(store.trials().len(), 2);
}

#[derive(Debug, Clone, PartialEq)]
struct Query {
    term: String,
    limit: u32,
}

varsnap::record!(Query { term, limit });

/// Test that record arguments travel as keyword arguments
#[tokio::test]
async fn test_record_arguments_are_reported_as_kwargs() {
    let query = Query {
        term: "tea".into(),
        limit: 2,
    };
    let store = Arc::new(
        MockSnapStore::new()
            .with_snaps(vec![snap_of("q", &query, &vec!["tea", "teapot"])])
            .with_trial(MockTrial::Ok {
                trial_url: Some("https://www.varsnap.com/trial/q/".into()),
            }),
    );
    let harness = harness(development_env(), store);
    let search = harness.varsnap("app::search", |query: Query| {
        let hits = ["tea", "teapot", "teacup"]
            .iter()
            .filter(|name| name.starts_with(query.term.as_str()))
            .take(query.limit as usize)
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        Ok::<_, String>(hits)
    });

    let (matched, report) = search.consumer().consume().await.into_pair();

    assert!(matched, "report:\n{report}");
    assert!(line_value(&report, LABEL_KWARGS).contains("tea"));
    assert!(report.starts_with("Report URL:"));
}
