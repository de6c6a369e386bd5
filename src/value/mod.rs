//! The closed set of value shapes that snaps carry.
//!
//! Call arguments, return values, raised errors and captured context are
//! all decomposed into a [`Value`] before they are encoded. The comparator
//! and the report renderer only ever look at values, never at the Rust
//! types they came from.

pub mod capture;
pub mod json;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeserializeError;

pub use capture::{Capture, Restore};
pub use json::Json;

/// A decomposed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    /// Key/value pairs in insertion order. Keys may be any value.
    Map(Vec<(Value, Value)>),
    Record(Record),
    /// An error raised by the function, captured as data.
    Raised(Box<Value>),
}

/// A named bag of fields: the decomposed form of a user struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

/// Borrowed view of a value used when walking two values side by side.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Scalar(&'a Value),
    Sequence(&'a [Value]),
    Mapping(&'a [(Value, Value)]),
    Record(&'a Record),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn seq(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Seq(items.into_iter().collect())
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Map(entries.into_iter().collect())
    }

    pub fn empty_map() -> Self {
        Value::Map(Vec::new())
    }

    pub fn raised(inner: Value) -> Self {
        Value::Raised(Box::new(inner))
    }

    /// Short lowercase name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Record(_) => "record",
            Value::Raised(_) => "raised",
        }
    }

    /// A raised error is viewed through the value it carries.
    pub fn shape(&self) -> Shape<'_> {
        match self {
            Value::Seq(items) => Shape::Sequence(items),
            Value::Map(entries) => Shape::Mapping(entries),
            Value::Record(record) => Shape::Record(record),
            Value::Raised(inner) => inner.shape(),
            other => Shape::Scalar(other),
        }
    }

    /// Nesting depth; scalars are depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Value::Seq(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Map(entries) => {
                1 + entries
                    .iter()
                    .map(|(k, v)| k.depth().max(v.depth()))
                    .max()
                    .unwrap_or(0)
            }
            Value::Record(record) => {
                1 + record
                    .fields
                    .iter()
                    .map(|(_, v)| v.depth())
                    .max()
                    .unwrap_or(0)
            }
            Value::Raised(inner) => 1 + inner.depth(),
            _ => 1,
        }
    }

    /// First non-finite float found anywhere in the value.
    pub fn find_non_finite(&self) -> Option<f64> {
        match self {
            Value::Float(f) if !f.is_finite() => Some(*f),
            Value::Seq(items) => items.iter().find_map(Value::find_non_finite),
            Value::Map(entries) => entries
                .iter()
                .find_map(|(k, v)| k.find_non_finite().or_else(|| v.find_non_finite())),
            Value::Record(record) => record.fields.iter().find_map(|(_, v)| v.find_non_finite()),
            Value::Raised(inner) => inner.find_non_finite(),
            _ => None,
        }
    }
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// The fields as a mapping with text keys.
    pub fn into_map(self) -> Value {
        Value::Map(
            self.fields
                .into_iter()
                .map(|(name, value)| (Value::Text(name), value))
                .collect(),
        )
    }
}

/// Named fields read back out of a record, or out of a mapping with text keys.
pub struct Fields<'a> {
    source: FieldSource<'a>,
}

enum FieldSource<'a> {
    Record(&'a Record),
    Map(&'a [(Value, Value)]),
}

impl<'a> Fields<'a> {
    /// Fails when `value` is a record of another type or has no named fields.
    pub fn of(value: &'a Value, type_name: &str) -> Result<Self, DeserializeError> {
        match value {
            Value::Record(record) if record.type_name == type_name => Ok(Self {
                source: FieldSource::Record(record),
            }),
            Value::Record(record) => Err(DeserializeError::UnresolvedType {
                expected: type_name.to_string(),
                found: record.type_name.clone(),
            }),
            Value::Map(entries) => Ok(Self {
                source: FieldSource::Map(entries),
            }),
            other => Err(DeserializeError::shape("record", other)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        match self.source {
            FieldSource::Record(record) => record.get(name),
            FieldSource::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                Value::Text(key) if key == name => Some(v),
                _ => None,
            }),
        }
    }

    pub fn restore<T: Restore>(&self, name: &str) -> Result<T, DeserializeError> {
        let value = self
            .get(name)
            .ok_or_else(|| DeserializeError::MissingField(name.to_string()))?;
        T::restore(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
            Value::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Record(record) => write!(f, "{record}"),
            Value::Raised(inner) => write!(f, "raised {inner}"),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name)?;
        if self.fields.is_empty() {
            return Ok(());
        }
        f.write_str(" { ")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(" }")
    }
}
