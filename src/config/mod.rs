mod env;
mod settings;

pub use env::{Environment, ProcessEnv, StaticEnv};
pub use settings::{
    Role, Settings, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, ENV_API_URL, ENV_CONSUMER_TOKEN,
    ENV_ENV, ENV_PRODUCER_TOKEN, ENV_VARSNAP,
};
