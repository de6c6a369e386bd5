//! Encoding captured values into printable payloads and back.
//!
//! A payload is a versioned JSON envelope around a [`Value`], base64-encoded
//! so it can travel in a form field. Failures are classified into
//! [`SerializeError`] and [`DeserializeError`]; a consumer treats the latter
//! as "this snap is garbage" and moves on.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{DeserializeError, SerializeError};
use crate::value::{Capture, Restore, Value};

/// Envelope format version. Payloads with any other version are rejected.
pub const PAYLOAD_VERSION: u32 = 1;

/// Deepest nesting accepted when encoding a value.
///
/// A record level costs four JSON levels on the wire and an empty record
/// leaf three, plus one for the envelope. At this depth the worst case is
/// 124 JSON levels, inside the decoder's limit of 127.
pub const MAX_DEPTH: usize = 31;

#[derive(Debug, Serialize)]
struct PayloadRef<'a> {
    version: u32,
    value: &'a Value,
}

#[derive(Debug, Deserialize)]
struct Payload {
    version: u32,
    value: Value,
}

/// Capture and encode any capturable value.
pub fn serialize<T: Capture + ?Sized>(value: &T) -> Result<String, SerializeError> {
    serialize_value(&value.capture()?)
}

/// Check that a captured value can be encoded and decoded again.
pub fn ensure_encodable(value: &Value) -> Result<(), SerializeError> {
    if value.depth() > MAX_DEPTH {
        return Err(SerializeError::TooDeep(MAX_DEPTH));
    }
    if let Some(x) = value.find_non_finite() {
        return Err(SerializeError::unsupported(
            "f64",
            format!("non-finite float {x}"),
        ));
    }
    Ok(())
}

/// Encode an already captured value.
pub fn serialize_value(value: &Value) -> Result<String, SerializeError> {
    ensure_encodable(value)?;
    let bytes = serde_json::to_vec(&PayloadRef {
        version: PAYLOAD_VERSION,
        value,
    })?;
    Ok(STANDARD.encode(bytes))
}

/// Decode a payload into a value.
pub fn deserialize(text: &str) -> Result<Value, DeserializeError> {
    let bytes = STANDARD.decode(text.trim().as_bytes())?;
    let payload: Payload = serde_json::from_slice(&bytes)?;
    if payload.version != PAYLOAD_VERSION {
        return Err(DeserializeError::UnsupportedVersion {
            found: payload.version,
            supported: PAYLOAD_VERSION,
        });
    }
    Ok(payload.value)
}

/// Decode a payload and rebuild a local type from it.
pub fn deserialize_as<T: Restore>(text: &str) -> Result<T, DeserializeError> {
    T::restore(&deserialize(text)?)
}
