//! The recorded inputs of one invocation.

use crate::error::{DeserializeError, SerializeError};
use crate::globals::Globals;
use crate::value::{Capture, Fields, Restore, Value};

const INPUTS_TYPE: &str = "Inputs";

static NO_ARGS: Value = Value::Unit;

/// Arguments and ambient state of a recorded call.
///
/// Travels as a mapping `{args, kwargs, globals}`. Rust has no keyword
/// arguments, so an argument that decomposes into named fields (a record or
/// a mapping) is recorded under `kwargs`; anything else is recorded as the
/// positional `args` sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    pub args: Value,
    pub kwargs: Value,
    pub globals: Globals,
}

impl Inputs {
    pub fn new(args: Value, kwargs: Value, globals: Globals) -> Self {
        Self {
            args,
            kwargs,
            globals,
        }
    }

    /// Split a captured argument into positional and named parts.
    pub fn capture<A: Capture + ?Sized>(args: &A, globals: Globals) -> Result<Self, SerializeError> {
        let (args, kwargs) = match args.capture()? {
            Value::Record(record) => (Value::Seq(Vec::new()), record.into_map()),
            map @ Value::Map(_) => (Value::Seq(Vec::new()), map),
            Value::Unit => (Value::Seq(Vec::new()), Value::empty_map()),
            seq @ Value::Seq(_) => (seq, Value::empty_map()),
            other => (Value::seq([other]), Value::empty_map()),
        };
        Ok(Self::new(args, kwargs, globals))
    }

    /// Rebuild the local argument type from the recorded inputs.
    ///
    /// Named arguments win when present. Otherwise the positional sequence is
    /// tried as a whole, then as "no arguments", then as its single element.
    pub fn bind<A: Restore>(&self) -> Result<A, DeserializeError> {
        let named = matches!(&self.kwargs, Value::Map(entries) if !entries.is_empty());
        if named {
            return A::restore(&self.kwargs);
        }

        let first_err = match A::restore(&self.args) {
            Ok(args) => return Ok(args),
            Err(err) => err,
        };
        let fallbacks: Vec<&Value> = match &self.args {
            Value::Seq(items) if items.is_empty() => vec![&NO_ARGS, &self.kwargs],
            Value::Seq(items) if items.len() == 1 => vec![&items[0]],
            _ => Vec::new(),
        };
        fallbacks
            .into_iter()
            .find_map(|candidate| A::restore(candidate).ok())
            .ok_or(first_err)
    }

    pub fn to_value(&self) -> Value {
        Value::map([
            (Value::text("args"), self.args.clone()),
            (Value::text("kwargs"), self.kwargs.clone()),
            (Value::text("globals"), self.globals.to_value()),
        ])
    }

    /// Read inputs back, accepting the older positional `[args, kwargs, globals]` layout.
    pub fn from_value(value: &Value) -> Result<Self, DeserializeError> {
        if let Value::Seq(items) = value {
            let [args, kwargs, globals] = items.as_slice() else {
                return Err(DeserializeError::OutOfRange("inputs triple"));
            };
            return Ok(Self::new(
                args.clone(),
                kwargs.clone(),
                Globals::from_value(globals)?,
            ));
        }

        let fields = Fields::of(value, INPUTS_TYPE)?;
        let field = |name: &str| {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| DeserializeError::MissingField(name.to_string()))
        };
        let globals = match fields.get("globals") {
            Some(globals) => Globals::from_value(globals)?,
            None => Globals::new(),
        };
        Ok(Self::new(field("args")?, field("kwargs")?, globals))
    }
}

impl Capture for Inputs {
    fn capture(&self) -> Result<Value, SerializeError> {
        Ok(self.to_value())
    }
}

impl Restore for Inputs {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        Inputs::from_value(value)
    }
}
