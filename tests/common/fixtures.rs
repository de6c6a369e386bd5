//! Environments, harnesses and snaps used across integration tests.

use std::sync::Arc;

use once_cell::sync::Lazy;
use varsnap::config::{ENV_CONSUMER_TOKEN, ENV_ENV, ENV_PRODUCER_TOKEN, ENV_VARSNAP};
use varsnap::{codec, Capture, Globals, Harness, Inputs, MockSnapStore, Snap, StaticEnv};

pub const PRODUCER_TOKEN: &str = "producer-token";
pub const CONSUMER_TOKEN: &str = "consumer-token";

/// Inputs of `add(2, 3)` as a producer would have recorded them.
pub static ADD_INPUTS: Lazy<String> = Lazy::new(|| {
    let inputs = Inputs::capture(&(2i64, 3i64), Globals::new()).expect("capture inputs");
    codec::serialize_value(&inputs.to_value()).expect("serialize inputs")
});

/// Environment where recording is on.
pub fn production_env() -> Arc<StaticEnv> {
    Arc::new(
        StaticEnv::new()
            .with(ENV_VARSNAP, "true")
            .with(ENV_ENV, "production")
            .with(ENV_PRODUCER_TOKEN, PRODUCER_TOKEN),
    )
}

/// Environment where replaying is on.
pub fn development_env() -> Arc<StaticEnv> {
    Arc::new(
        StaticEnv::new()
            .with(ENV_VARSNAP, "true")
            .with(ENV_ENV, "development")
            .with(ENV_CONSUMER_TOKEN, CONSUMER_TOKEN),
    )
}

pub fn harness(env: Arc<StaticEnv>, store: Arc<MockSnapStore>) -> Harness {
    Harness::builder().env(env).store(store).build()
}

/// A snap recording `add(2, 3)` returning `output`.
pub fn add_snap(id: &str, output: i64) -> Snap {
    Snap::new(id, ADD_INPUTS.as_str(), codec::serialize(&output).expect("serialize output"))
}

/// A snap with arbitrary inputs and output.
pub fn snap_of<A: Capture, O: Capture>(id: &str, args: &A, output: &O) -> Snap {
    let inputs = Inputs::capture(args, Globals::new()).expect("capture inputs");
    Snap::new(
        id,
        codec::serialize_value(&inputs.to_value()).expect("serialize inputs"),
        codec::serialize(output).expect("serialize output"),
    )
}
