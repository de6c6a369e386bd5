//! Replay side: fetches snaps, reruns them locally and reports the verdict.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::codec;
use crate::compare;
use crate::config::{Environment, Settings};
use crate::error::{ReplayError, SerializeError};
use crate::inputs::Inputs;
use crate::report::{
    align_report, ReportLine, LABEL_ARGS, LABEL_DEV_OUTPUTS, LABEL_EXCEPTION, LABEL_FUNCTION,
    LABEL_KWARGS, LABEL_MATCHES, LABEL_PROD_OUTPUTS, LABEL_REPORT_URL,
};
use crate::signature::Signature;
use crate::store::{ConsumeRequest, ProduceTrialRequest, Snap, SnapStore};
use crate::value::Value;

/// Pause between polls of the watch loop.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// What a local rerun produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Replayed {
    /// The returned value, or the raised error wrapped in [`Value::Raised`].
    pub output: Value,
    /// Rendered error text when the function failed.
    pub exception: Option<String>,
}

impl Replayed {
    /// Stand-in for a local output that could not be captured. It never
    /// matches a recorded output.
    pub fn unrepresentable(err: &SerializeError) -> Self {
        Self {
            output: Value::raised(Value::text(format!("unrepresentable output: {err}"))),
            exception: Some(err.to_string()),
        }
    }
}

/// A function that can be rerun from recorded inputs.
pub trait ReplayTarget: Send + Sync {
    /// Fully qualified name, the basis of the signature.
    fn name(&self) -> &str;

    /// Rebuild arguments and context from `inputs` and call the function.
    ///
    /// The function's own failure is part of [`Replayed`]. A
    /// [`ReplayError::Deserialize`] means the inputs could not be bound and the
    /// snap is skipped; a [`ReplayError::Serialize`] means the output could not
    /// be captured and the snap counts as a mismatch.
    fn replay(&self, inputs: &Inputs) -> Result<Replayed, ReplayError>;
}

/// Result of replaying a single snap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Already seen, or not decodable here.
    Skipped,
    Trial { matches: bool, report: String },
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeResult {
    /// Nothing to replay: no snaps, an unusable response, or every snap skipped.
    Idle,
    Replayed { matched: bool, report: String },
}

impl ConsumeResult {
    /// `(all matched, combined report)`; idle polls are vacuously matching.
    pub fn into_pair(self) -> (bool, String) {
        match self {
            ConsumeResult::Idle => (true, String::new()),
            ConsumeResult::Replayed { matched, report } => (matched, report),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConsumeResult::Idle)
    }
}

/// Replays snaps of one monitored function.
pub struct Consumer {
    target: Arc<dyn ReplayTarget>,
    signature: Signature,
    env: Arc<dyn Environment>,
    store: Arc<dyn SnapStore>,
    last_snap_id: Mutex<Option<String>>,
    interval: Duration,
}

impl Consumer {
    pub fn new(
        target: Arc<dyn ReplayTarget>,
        env: Arc<dyn Environment>,
        store: Arc<dyn SnapStore>,
    ) -> Self {
        Self {
            signature: Signature::resolve(target.name()),
            target,
            env,
            store,
            last_snap_id: Mutex::new(None),
            interval: WATCH_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        self.target.name()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_enabled(&self) -> bool {
        Settings::load(self.env.as_ref()).consumer_enabled()
    }

    /// Id of the most recently processed snap.
    pub fn last_snap_id(&self) -> Option<String> {
        self.last_snap_id.lock().clone()
    }

    /// Forget the last processed snap so the next poll replays everything.
    pub fn reset_cursor(&self) {
        *self.last_snap_id.lock() = None;
    }

    /// Fetch pending snaps and replay each of them.
    pub async fn consume(&self) -> ConsumeResult {
        let settings = Settings::load(self.env.as_ref());
        let request = ConsumeRequest {
            consumer_token: settings.consumer_token.clone(),
            signature: self.signature.to_string(),
        };

        let response = match self.store.fetch_snaps(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(signature = %self.signature, error = %err, "fetching snaps failed");
                return ConsumeResult::Idle;
            }
        };
        if !response.is_ok() {
            tracing::debug!(signature = %self.signature, status = %response.status, "store has nothing to replay");
            return ConsumeResult::Idle;
        }

        let mut matched = true;
        let mut reports = Vec::new();
        for snap in &response.results {
            if let ReplayOutcome::Trial { matches, report } = self.consume_one(snap).await {
                matched &= matches;
                reports.push(report);
            }
        }

        if reports.is_empty() {
            return ConsumeResult::Idle;
        }
        ConsumeResult::Replayed {
            matched,
            report: reports.join("\n\n"),
        }
    }

    /// Replay one snap against the local function.
    pub async fn consume_one(&self, snap: &Snap) -> ReplayOutcome {
        {
            let mut last = self.last_snap_id.lock();
            if last.as_deref() == Some(snap.id.as_str()) {
                return ReplayOutcome::Skipped;
            }
            *last = Some(snap.id.clone());
        }
        tracing::info!(signature = %self.signature, snap_id = %snap.id, "receiving snap");

        let decoded = codec::deserialize(&snap.inputs)
            .and_then(|inputs| Inputs::from_value(&inputs))
            .and_then(|inputs| Ok((inputs, codec::deserialize(&snap.prod_outputs)?)));
        let (inputs, prod_outputs) = match decoded {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!(snap_id = %snap.id, error = %err, "skipping undecodable snap");
                return ReplayOutcome::Skipped;
            }
        };

        let captured = match self.target.replay(&inputs) {
            Ok(replayed) => {
                codec::serialize_value(&replayed.output).map(|encoded| (replayed, encoded))
            }
            Err(ReplayError::Serialize(err)) => Err(err),
            Err(err) => {
                tracing::warn!(snap_id = %snap.id, error = %err, "cannot replay snap locally");
                return ReplayOutcome::Skipped;
            }
        };
        let (replayed, dev_outputs, matches) = match captured {
            Ok((replayed, dev_outputs)) => {
                let matches = compare::equal(&prod_outputs, &replayed.output);
                (replayed, dev_outputs, matches)
            }
            Err(err) => {
                tracing::warn!(snap_id = %snap.id, error = %err, "cannot capture local output");
                let replayed = Replayed::unrepresentable(&err);
                let dev_outputs = codec::serialize_value(&replayed.output).unwrap_or_default();
                (replayed, dev_outputs, false)
            }
        };

        let mut lines = Vec::new();
        if let Some(trial_url) = self.report_central(&snap.id, dev_outputs, matches).await {
            lines.push(ReportLine::new(LABEL_REPORT_URL, trial_url));
        }
        lines.extend(self.report_log(&inputs, &prod_outputs, &replayed, matches));
        let report = align_report(&lines);

        if matches {
            tracing::info!(signature = %self.signature, snap_id = %snap.id, "\n{report}");
        } else {
            tracing::error!(signature = %self.signature, snap_id = %snap.id, "\n{report}");
        }
        ReplayOutcome::Trial { matches, report }
    }

    /// Submit the trial; returns the store's report URL when it gives one.
    pub async fn report_central(
        &self,
        snap_id: &str,
        dev_outputs: String,
        matches: bool,
    ) -> Option<String> {
        let settings = Settings::load(self.env.as_ref());
        let request = ProduceTrialRequest {
            consumer_token: settings.consumer_token,
            snap_id: snap_id.to_string(),
            dev_outputs,
            matches,
        };
        match self.store.produce_trial(request).await {
            Ok(response) if response.is_ok() => response.trial_url,
            Ok(response) => {
                tracing::debug!(snap_id, status = %response.status, "trial not accepted");
                None
            }
            Err(err) => {
                tracing::debug!(snap_id, error = %err, "trial submission failed");
                None
            }
        }
    }

    /// Local report lines, in display order.
    pub fn report_log(
        &self,
        inputs: &Inputs,
        prod_outputs: &Value,
        replayed: &Replayed,
        matches: bool,
    ) -> Vec<ReportLine> {
        let mut lines = vec![
            ReportLine::new(LABEL_FUNCTION, self.target.name()),
            ReportLine::new(LABEL_ARGS, &inputs.args),
            ReportLine::new(LABEL_KWARGS, &inputs.kwargs),
            ReportLine::new(LABEL_PROD_OUTPUTS, prod_outputs),
            ReportLine::new(LABEL_DEV_OUTPUTS, &replayed.output),
        ];
        if let Some(exception) = &replayed.exception {
            lines.push(ReportLine::new(LABEL_EXCEPTION, exception));
        }
        lines.push(ReportLine::new(LABEL_MATCHES, matches));
        lines
    }

    /// Poll forever. Returns immediately when replaying is disabled.
    pub async fn consume_watch(&self) {
        if !self.is_enabled() {
            return;
        }
        tracing::info!(function = %self.name(), "consuming snaps");
        loop {
            self.consume().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("signature", &self.signature)
            .field("last_snap_id", &self.last_snap_id())
            .finish_non_exhaustive()
    }
}
