//! Record real calls in production and replay them against local code.
//!
//! A function wrapped with [`Harness::varsnap`] behaves exactly as before.
//! In a production environment each call's arguments, context and outcome
//! are uploaded as a snap; in a development environment a [`Consumer`]
//! fetches those snaps, reruns the local function and reports whether the
//! outputs still match.

pub mod assertion;
pub mod codec;
pub mod compare;
pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod globals;
pub mod harness;
pub mod inputs;
pub mod producer;
pub mod queue;
pub mod report;
pub mod signature;
pub mod store;
pub mod value;

pub use assertion::{check, AssertionOutcome};
pub use codec::{deserialize, deserialize_as, serialize, serialize_value};
pub use compare::equal;
pub use config::{Environment, ProcessEnv, Role, Settings, StaticEnv};
pub use consumer::{ConsumeResult, Consumer, ReplayOutcome, ReplayTarget, Replayed};
pub use dispatch::{Target, Varsnap};
pub use error::{DeserializeError, ReplayError, SerializeError, StoreError};
pub use globals::{snapshot_globals, Context, Globals, GlobalsBuilder};
pub use harness::{varsnap, Harness, HarnessBuilder};
pub use inputs::Inputs;
pub use producer::Producer;
pub use queue::ProduceQueue;
pub use signature::Signature;
pub use store::{HttpSnapStore, MockSnapStore, Snap, SnapStore};
pub use value::{Capture, Json, Record, Restore, Value};
