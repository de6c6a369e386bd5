//! Drive every registered consumer from a test.
//!
//! # Example
//! ```no_run
//! # async fn run() {
//! use varsnap::{assertion, Harness};
//!
//! assertion::check(Harness::global()).await.assert();
//! # }
//! ```

use crate::consumer::ConsumeResult;
use crate::harness::Harness;

/// Aggregate verdict over all registered consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionOutcome {
    Passed,
    /// Nothing was replayed.
    Skipped(String),
    /// Mismatch reports, separated by blank lines.
    Failed(String),
}

pub const NO_SNAPS: &str = "no snaps found";

impl AssertionOutcome {
    /// Panic on failure. Skips are logged, since the test harness has no skip state.
    pub fn assert(self) {
        match self {
            AssertionOutcome::Passed => {}
            AssertionOutcome::Skipped(reason) => {
                tracing::warn!(reason = %reason, "varsnap check skipped");
            }
            AssertionOutcome::Failed(detail) => panic!("{detail}"),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AssertionOutcome::Failed(_))
    }
}

/// Replay pending snaps for every consumer, in registration order.
///
/// Each consumer's cursor is reset first so earlier runs do not hide snaps.
pub async fn check(harness: &Harness) -> AssertionOutcome {
    let mut results = Vec::new();
    for consumer in harness.consumers() {
        consumer.reset_cursor();
        match consumer.consume().await {
            ConsumeResult::Idle => continue,
            ConsumeResult::Replayed { matched, report } => results.push((matched, report)),
        }
    }

    if results.is_empty() {
        return AssertionOutcome::Skipped(NO_SNAPS.to_string());
    }
    let failures: Vec<String> = results
        .into_iter()
        .filter(|(matched, _)| !matched)
        .map(|(_, report)| report)
        .collect();
    if failures.is_empty() {
        AssertionOutcome::Passed
    } else {
        AssertionOutcome::Failed(failures.join("\n\n"))
    }
}
