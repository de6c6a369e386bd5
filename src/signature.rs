//! Stable identifiers that tie producer snaps to consumer replays.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Language tag that prefixes every signature.
pub const SIGNATURE_LANGUAGE: &str = "rust";

/// Version of the signature format, taken from the crate version.
pub const SIGNATURE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifies "the same" function across independent processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Build the signature for a fully qualified function name.
    pub fn resolve(qualified_name: &str) -> Self {
        Self(format!(
            "{SIGNATURE_LANGUAGE}.{SIGNATURE_VERSION}.{qualified_name}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified name of a function item, as seen from the call site.
///
/// ```
/// fn add(x: i64, y: i64) -> i64 {
///     x + y
/// }
///
/// assert!(varsnap::qualname!(add).ends_with("::add"));
/// ```
#[macro_export]
macro_rules! qualname {
    ($func:ident) => {
        concat!(module_path!(), "::", stringify!($func))
    };
    ($ty:ident :: $method:ident) => {
        concat!(module_path!(), "::", stringify!($ty), "::", stringify!($method))
    };
}
