//! Recording side: turns real invocations into snaps.

use std::sync::Arc;

use crate::codec;
use crate::config::{Environment, Settings};
use crate::error::SerializeError;
use crate::inputs::Inputs;
use crate::signature::Signature;
use crate::store::{ProduceSnapRequest, SnapStore};
use crate::value::Value;

/// Records invocations of one monitored function.
pub struct Producer {
    name: String,
    signature: Signature,
    env: Arc<dyn Environment>,
    store: Arc<dyn SnapStore>,
}

impl Producer {
    pub fn new(
        name: impl Into<String>,
        env: Arc<dyn Environment>,
        store: Arc<dyn SnapStore>,
    ) -> Self {
        let name = name.into();
        Self {
            signature: Signature::resolve(&name),
            name,
            env,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Read fresh on every call so a configuration toggle applies immediately.
    pub fn is_enabled(&self) -> bool {
        Settings::load(self.env.as_ref()).producer_enabled()
    }

    /// Build the submission for one invocation.
    pub fn encode(
        &self,
        settings: &Settings,
        inputs: &Inputs,
        output: &Value,
    ) -> Result<ProduceSnapRequest, SerializeError> {
        Ok(ProduceSnapRequest {
            producer_token: settings.producer_token.clone(),
            signature: self.signature.to_string(),
            inputs: codec::serialize_value(&inputs.to_value())?,
            prod_outputs: codec::serialize_value(output)?,
        })
    }

    /// Submit one recorded invocation.
    ///
    /// Never fails: unrepresentable snaps are dropped and the store's answer
    /// is ignored, both with a debug log only.
    pub async fn produce(&self, inputs: Inputs, output: Value) {
        let settings = Settings::load(self.env.as_ref());
        if !settings.producer_enabled() {
            return;
        }

        let request = match self.encode(&settings, &inputs, &output) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(signature = %self.signature, error = %err, "dropping unrepresentable snap");
                return;
            }
        };

        tracing::info!(signature = %self.signature, "producing snap");
        if let Err(err) = self.store.produce_snap(request).await {
            tracing::debug!(signature = %self.signature, error = %err, "snap submission failed");
        }
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}
