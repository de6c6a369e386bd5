//! Ambient state a monitored function depends on.
//!
//! Instead of reading process-wide bindings, a monitored function receives
//! its ambient state as a context argument. The producer snapshots that
//! context into [`Globals`] next to the call's arguments; the consumer
//! rebuilds the context from the snapshot and passes it into the replay.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{DeserializeError, SerializeError};
use crate::value::{Capture, Restore, Value};

/// Names with this prefix are never captured.
pub const RESERVED_PREFIX: &str = "__";

/// Captured ambient state: named values in capture order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Globals {
    entries: Vec<(String, Value)>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite a binding.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Rebuild a typed binding.
    pub fn restore<T: Restore>(&self, name: &str) -> Result<T, DeserializeError> {
        let value = self
            .get(name)
            .ok_or_else(|| DeserializeError::MissingField(name.to_string()))?;
        T::restore(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// The bindings as a mapping with text keys, the shape they travel in.
    pub fn to_value(&self) -> Value {
        Value::map(
            self.entries
                .iter()
                .map(|(name, value)| (Value::text(name.clone()), value.clone())),
        )
    }

    /// Read bindings back from a mapping; non-text keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, DeserializeError> {
        let Value::Map(entries) = value else {
            return Err(DeserializeError::shape("mapping", value));
        };
        let mut globals = Globals::new();
        for (key, value) in entries {
            if let Value::Text(name) = key {
                globals.set(name.clone(), value.clone());
            }
        }
        Ok(globals)
    }
}

/// Collects bindings while a context snapshots itself.
///
/// Reserved names are skipped. A binding whose capture fails, or whose value
/// could not be encoded, is dropped on its own.
#[derive(Debug, Default)]
pub struct GlobalsBuilder {
    globals: Globals,
    dropped: Vec<String>,
}

impl GlobalsBuilder {
    pub fn capture<T: Capture + ?Sized>(&mut self, name: &str, value: &T) -> &mut Self {
        self.capture_with(name, || value.capture())
    }

    pub fn capture_with(
        &mut self,
        name: &str,
        capture: impl FnOnce() -> Result<Value, SerializeError>,
    ) -> &mut Self {
        if name.starts_with(RESERVED_PREFIX) {
            return self;
        }
        let captured = capture().and_then(|value| {
            codec::ensure_encodable(&value)?;
            Ok(value)
        });
        match captured {
            Ok(value) => self.globals.set(name, value),
            Err(err) => {
                tracing::debug!(name, error = %err, "skipping unrepresentable global");
                self.dropped.push(name.to_string());
            }
        }
        self
    }

    /// Names dropped because their capture failed.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn finish(self) -> Globals {
        self.globals
    }
}

/// A context passed into monitored functions.
pub trait Context: Sized {
    fn capture_globals(&self, globals: &mut GlobalsBuilder);

    fn restore_globals(globals: &Globals) -> Result<Self, DeserializeError>;
}

impl Context for () {
    fn capture_globals(&self, _globals: &mut GlobalsBuilder) {}

    fn restore_globals(_globals: &Globals) -> Result<Self, DeserializeError> {
        Ok(())
    }
}

/// A free-form bag works as a context on its own.
impl Context for Globals {
    fn capture_globals(&self, globals: &mut GlobalsBuilder) {
        for (name, value) in self.iter() {
            globals.capture(name, value);
        }
    }

    fn restore_globals(globals: &Globals) -> Result<Self, DeserializeError> {
        Ok(globals.clone())
    }
}

/// Best-effort snapshot of a context.
pub fn snapshot_globals<C: Context>(context: &C) -> Globals {
    let mut builder = GlobalsBuilder::default();
    context.capture_globals(&mut builder);
    builder.finish()
}

/// Implement [`Context`] for a struct whose named fields are the bindings.
///
/// ```
/// use varsnap::context;
///
/// struct Pricing {
///     tax_rate: f64,
///     currency: String,
/// }
///
/// context!(Pricing { tax_rate, currency });
/// ```
#[macro_export]
macro_rules! context {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::globals::Context for $ty {
            fn capture_globals(&self, globals: &mut $crate::globals::GlobalsBuilder) {
                $( globals.capture(stringify!($field), &self.$field); )*
            }

            fn restore_globals(
                globals: &$crate::globals::Globals,
            ) -> ::std::result::Result<Self, $crate::error::DeserializeError> {
                Ok(Self {
                    $($field: globals.restore(stringify!($field))?,)*
                })
            }
        }
    };
}
