//! The remote snap store.
//!
//! All durable state lives in the store; producers post snaps into it and
//! consumers fetch them back and post trials. [`SnapStore`] is the seam:
//! [`HttpSnapStore`] talks to the real service, [`MockSnapStore`] is the
//! in-process double used by tests.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use http::HttpSnapStore;
pub use mock::{MockFetch, MockSnapStore, MockTrial};

/// Status string the store uses for a successful response.
pub const STATUS_OK: &str = "ok";

/// Body of a snap submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceSnapRequest {
    pub producer_token: String,
    pub signature: String,
    pub inputs: String,
    pub prod_outputs: String,
}

/// Body of a request for unconsumed snaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeRequest {
    pub consumer_token: String,
    pub signature: String,
}

/// One recorded invocation as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snap {
    pub id: String,
    pub inputs: String,
    pub prod_outputs: String,
}

impl Snap {
    pub fn new(
        id: impl Into<String>,
        inputs: impl Into<String>,
        prod_outputs: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            inputs: inputs.into(),
            prod_outputs: prod_outputs.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<Snap>,
}

impl ConsumeResponse {
    pub fn ok(results: Vec<Snap>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            results,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Body of a trial submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceTrialRequest {
    pub consumer_token: String,
    pub snap_id: String,
    pub dev_outputs: String,
    pub matches: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_url: Option<String>,
}

impl TrialResponse {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Request/response API of the snap service.
#[async_trait]
pub trait SnapStore: Send + Sync {
    /// Submit a recorded invocation. The response carries nothing useful.
    async fn produce_snap(&self, request: ProduceSnapRequest) -> Result<(), StoreError>;

    /// Fetch unconsumed snaps for a signature.
    async fn fetch_snaps(&self, request: ConsumeRequest) -> Result<ConsumeResponse, StoreError>;

    /// Submit the outcome of a replay.
    async fn produce_trial(&self, request: ProduceTrialRequest)
        -> Result<TrialResponse, StoreError>;
}
