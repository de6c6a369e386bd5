use std::time::Duration;

use super::env::Environment;

/// Monitoring switch; must be "true".
pub const ENV_VARSNAP: &str = "VARSNAP";
/// Deployment role: "production" records, "development" replays.
pub const ENV_ENV: &str = "ENV";
pub const ENV_PRODUCER_TOKEN: &str = "VARSNAP_PRODUCER_TOKEN";
pub const ENV_CONSUMER_TOKEN: &str = "VARSNAP_CONSUMER_TOKEN";
/// Optional base URL of the snap service.
pub const ENV_API_URL: &str = "VARSNAP_API_URL";

pub const DEFAULT_API_URL: &str = "https://www.varsnap.com";

const PRODUCE_SNAP_PATH: &str = "/api/snap/produce/";
const CONSUME_SNAP_PATH: &str = "/api/snap/consume/";
const PRODUCE_TRIAL_PATH: &str = "/api/trial/produce/";

/// Request timeout for calls to the snap service.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Deployment role read from `ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Production,
    Development,
    Other,
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "production" => Role::Production,
            "development" => Role::Development,
            _ => Role::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Production => "production",
            Role::Development => "development",
            Role::Other => "other",
        }
    }
}

/// One read of the varsnap environment.
///
/// Values are lowercased and unset variables read as empty, so matching is
/// case-insensitive. Settings are cheap to load and are loaded again on
/// every gating check, so a toggle takes effect on the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub role: Role,
    pub producer_token: String,
    pub consumer_token: String,
    pub api_url: String,
}

impl Settings {
    pub fn load(env: &dyn Environment) -> Self {
        let read = |key: &str| env.var(key).unwrap_or_default().to_lowercase();
        let api_url = env
            .var(ENV_API_URL)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self {
            enabled: read(ENV_VARSNAP) == "true",
            role: Role::parse(&read(ENV_ENV)),
            producer_token: read(ENV_PRODUCER_TOKEN),
            consumer_token: read(ENV_CONSUMER_TOKEN),
            api_url,
        }
    }

    /// Recording is on: monitoring enabled, production role, producer token set.
    pub fn producer_enabled(&self) -> bool {
        self.enabled && self.role == Role::Production && !self.producer_token.is_empty()
    }

    /// Replaying is on: monitoring enabled, development role, consumer token set.
    pub fn consumer_enabled(&self) -> bool {
        self.enabled && self.role == Role::Development && !self.consumer_token.is_empty()
    }

    pub fn produce_snap_url(&self) -> String {
        format!("{}{PRODUCE_SNAP_PATH}", self.api_url)
    }

    pub fn consume_snap_url(&self) -> String {
        format!("{}{CONSUME_SNAP_PATH}", self.api_url)
    }

    pub fn produce_trial_url(&self) -> String {
        format!("{}{PRODUCE_TRIAL_PATH}", self.api_url)
    }
}
