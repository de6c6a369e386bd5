//! Mock snap store for deterministic testing
//!
//! Implements [`SnapStore`] in memory: fetches answer with pre-configured
//! responses and every request is captured for later verification.
//!
//! # Example
//! ```no_run
//! use varsnap::store::{MockSnapStore, Snap};
//!
//! let store = MockSnapStore::new().with_snaps(vec![Snap::new("abcd", "...", "...")]);
//! // Hand `store` to a harness, then inspect `store.trials()`...
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{
    ConsumeRequest, ConsumeResponse, ProduceSnapRequest, ProduceTrialRequest, Snap, SnapStore,
    TrialResponse, STATUS_OK,
};

/// A scripted answer to one fetch.
#[derive(Debug, Clone)]
pub enum MockFetch {
    Response(ConsumeResponse),
    /// The body could not be parsed.
    Malformed,
    /// The request itself failed.
    Failed,
}

/// How trial submissions are answered.
#[derive(Debug, Clone)]
pub enum MockTrial {
    Ok { trial_url: Option<String> },
    Status(String),
    Malformed,
}

impl Default for MockTrial {
    fn default() -> Self {
        MockTrial::Ok { trial_url: None }
    }
}

/// In-memory snap store.
///
/// Scripted fetches are answered first, in order; after that every fetch
/// answers with the standing response (empty "ok" unless configured).
#[derive(Debug, Default)]
pub struct MockSnapStore {
    scripted: Mutex<VecDeque<MockFetch>>,
    standing: Mutex<Option<MockFetch>>,
    trial: Mutex<MockTrial>,
    fail_produce: Mutex<bool>,
    produced: Mutex<Vec<ProduceSnapRequest>>,
    fetches: Mutex<Vec<ConsumeRequest>>,
    trials: Mutex<Vec<ProduceTrialRequest>>,
}

impl MockSnapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every fetch with these snaps.
    pub fn with_snaps(self, snaps: Vec<Snap>) -> Self {
        self.set_standing(MockFetch::Response(ConsumeResponse::ok(snaps)));
        self
    }

    pub fn with_trial(self, trial: MockTrial) -> Self {
        *self.trial.lock() = trial;
        self
    }

    pub fn failing_produce(self) -> Self {
        *self.fail_produce.lock() = true;
        self
    }

    pub fn set_standing(&self, fetch: MockFetch) {
        *self.standing.lock() = Some(fetch);
    }

    /// Queue a one-shot answer ahead of the standing response.
    pub fn push_fetch(&self, fetch: MockFetch) {
        self.scripted.lock().push_back(fetch);
    }

    pub fn produced(&self) -> Vec<ProduceSnapRequest> {
        self.produced.lock().clone()
    }

    pub fn fetches(&self) -> Vec<ConsumeRequest> {
        self.fetches.lock().clone()
    }

    pub fn trials(&self) -> Vec<ProduceTrialRequest> {
        self.trials.lock().clone()
    }

    /// Serve every snap produced so far to consumers, each under a fresh id.
    ///
    /// Lets a test record through a producer and replay through a consumer
    /// against the same store.
    pub fn promote_produced(&self) -> Vec<Snap> {
        let snaps: Vec<Snap> = self
            .produced
            .lock()
            .iter()
            .map(|request| {
                Snap::new(
                    Uuid::new_v4().to_string(),
                    request.inputs.clone(),
                    request.prod_outputs.clone(),
                )
            })
            .collect();
        self.set_standing(MockFetch::Response(ConsumeResponse::ok(snaps.clone())));
        snaps
    }

    fn next_fetch(&self) -> MockFetch {
        if let Some(fetch) = self.scripted.lock().pop_front() {
            return fetch;
        }
        self.standing
            .lock()
            .clone()
            .unwrap_or_else(|| MockFetch::Response(ConsumeResponse::ok(Vec::new())))
    }
}

#[async_trait]
impl SnapStore for MockSnapStore {
    async fn produce_snap(&self, request: ProduceSnapRequest) -> Result<(), StoreError> {
        self.produced.lock().push(request);
        if *self.fail_produce.lock() {
            return Err(StoreError::Other("mock produce failure".into()));
        }
        Ok(())
    }

    async fn fetch_snaps(&self, request: ConsumeRequest) -> Result<ConsumeResponse, StoreError> {
        self.fetches.lock().push(request);
        match self.next_fetch() {
            MockFetch::Response(response) => Ok(response),
            MockFetch::Malformed => Err(StoreError::Malformed("mock malformed body".into())),
            MockFetch::Failed => Err(StoreError::Other("mock fetch failure".into())),
        }
    }

    async fn produce_trial(
        &self,
        request: ProduceTrialRequest,
    ) -> Result<TrialResponse, StoreError> {
        self.trials.lock().push(request);
        match self.trial.lock().clone() {
            MockTrial::Ok { trial_url } => Ok(TrialResponse {
                status: STATUS_OK.to_string(),
                trial_url,
            }),
            MockTrial::Status(status) => Ok(TrialResponse {
                status,
                trial_url: None,
            }),
            MockTrial::Malformed => Err(StoreError::Malformed("mock malformed body".into())),
        }
    }
}
