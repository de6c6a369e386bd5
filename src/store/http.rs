//! The snap store behind the public HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::{Settings, DEFAULT_REQUEST_TIMEOUT};
use crate::error::StoreError;
use crate::store::{
    ConsumeRequest, ConsumeResponse, ProduceSnapRequest, ProduceTrialRequest, SnapStore,
    TrialResponse,
};

/// Snap store reached over HTTP: form-encoded POST bodies, JSON responses.
#[derive(Clone)]
pub struct HttpSnapStore {
    client: Client,
    produce_snap_url: String,
    consume_snap_url: String,
    produce_trial_url: String,
}

impl HttpSnapStore {
    pub fn new(settings: &Settings) -> Self {
        Self::with_timeout(settings, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Falls back to a client without a timeout if the configured one cannot be built.
    pub fn with_timeout(settings: &Settings, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to build HTTP client, using defaults");
            Client::new()
        });
        Self {
            client,
            produce_snap_url: settings.produce_snap_url(),
            consume_snap_url: settings.consume_snap_url(),
            produce_trial_url: settings.produce_trial_url(),
        }
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, StoreError>
    where
        B: serde::Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.client.post(url).form(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| {
            StoreError::Malformed(format!("{status} from {url}: {err}"))
        })
    }
}

#[async_trait]
impl SnapStore for HttpSnapStore {
    async fn produce_snap(&self, request: ProduceSnapRequest) -> Result<(), StoreError> {
        self.client
            .post(&self.produce_snap_url)
            .form(&request)
            .send()
            .await?;
        Ok(())
    }

    async fn fetch_snaps(&self, request: ConsumeRequest) -> Result<ConsumeResponse, StoreError> {
        self.post_json(&self.consume_snap_url, &request).await
    }

    async fn produce_trial(
        &self,
        request: ProduceTrialRequest,
    ) -> Result<TrialResponse, StoreError> {
        self.post_json(&self.produce_trial_url, &request).await
    }
}

impl std::fmt::Debug for HttpSnapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSnapStore")
            .field("consume_snap_url", &self.consume_snap_url)
            .finish_non_exhaustive()
    }
}
