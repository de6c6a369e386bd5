//! Error types for capturing, encoding and transporting snaps.
//!
//! The split between [`SerializeError`] and [`DeserializeError`] is the
//! codec's contract: both are recoverable (a snap is dropped or skipped),
//! while anything outside them (panics) is left to propagate.

use thiserror::Error;

/// A value could not be captured or encoded into a payload.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The value has a shape the wire format cannot represent.
    #[error("cannot capture {type_name}: {reason}")]
    Unsupported {
        type_name: &'static str,
        reason: String,
    },

    /// An integer does not fit the signed 64-bit wire representation.
    #[error("integer {0} does not fit in i64")]
    IntegerOverflow(String),

    /// Nesting exceeded the capture depth limit (runaway or cyclic data).
    #[error("value nesting exceeds {0} levels")]
    TooDeep(usize),

    /// A serde bridge failed while converting a value.
    #[error("serde conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl SerializeError {
    pub fn unsupported(type_name: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            type_name,
            reason: reason.into(),
        }
    }
}

/// A fetched payload could not be decoded or rebuilt into a local type.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// The printable text is not valid base64.
    #[error("malformed payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The decoded bytes are not a valid payload envelope.
    #[error("corrupt payload: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The envelope was written by an unknown format version.
    #[error("unsupported payload version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A record references a type that does not match the local one.
    #[error("unresolved type: expected {expected}, found {found}")]
    UnresolvedType { expected: String, found: String },

    /// The value has a different shape than the local type expects.
    #[error("shape mismatch: expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    /// A record or context lacks a field the local type requires.
    #[error("missing field `{0}`")]
    MissingField(String),

    /// A value is in range for the wire but not for the local type.
    #[error("value out of range for {0}")]
    OutOfRange(&'static str),
}

impl DeserializeError {
    pub fn shape(expected: &'static str, found: &crate::value::Value) -> Self {
        Self::Shape {
            expected,
            found: found.kind(),
        }
    }
}

/// Failure talking to the remote snap store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was absent or not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The store answered with a status other than "ok".
    #[error("store returned status {0:?}")]
    Status(String),

    /// Injected or otherwise non-transport failure.
    #[error("{0}")]
    Other(String),
}

/// Why a snap could not be replayed locally.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),
}
