//! Bridge for types that already speak serde.
//!
//! Wrapping a value in [`Json`] captures it through `serde_json`, so any
//! `#[derive(Serialize, Deserialize)]` type can be monitored without a
//! hand-written [`record!`](crate::record) impl. Objects become mappings
//! with text keys, which means the type name is not checked on restore.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number};

use crate::error::{DeserializeError, SerializeError};
use crate::value::{Capture, Restore, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> Capture for Json<T> {
    fn capture(&self) -> Result<Value, SerializeError> {
        from_json(serde_json::to_value(&self.0)?)
    }
}

impl<T: DeserializeOwned> Restore for Json<T> {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        let json = to_json(value)?;
        Ok(Json(serde_json::from_value(json)?))
    }
}

fn from_json(json: serde_json::Value) -> Result<Value, SerializeError> {
    Ok(match json {
        serde_json::Value::Null => Value::Unit,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if n.is_u64() {
                return Err(SerializeError::IntegerOverflow(n.to_string()));
            } else {
                match n.as_f64() {
                    Some(x) => Value::Float(x),
                    None => {
                        return Err(SerializeError::unsupported(
                            "serde_json::Number",
                            format!("{n} is not representable"),
                        ))
                    }
                }
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => Value::Seq(
            items
                .into_iter()
                .map(from_json)
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(object) => Value::Map(
            object
                .into_iter()
                .map(|(k, v)| Ok((Value::Text(k), from_json(v)?)))
                .collect::<Result<_, SerializeError>>()?,
        ),
    })
}

fn to_json(value: &Value) -> Result<serde_json::Value, DeserializeError> {
    Ok(match value {
        Value::Unit => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(x) => Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .ok_or(DeserializeError::OutOfRange("f64"))?,
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(bytes) => {
            serde_json::Value::Array(bytes.iter().map(|b| (*b).into()).collect())
        }
        Value::Seq(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?)
        }
        Value::Map(entries) => {
            let mut object = Map::new();
            for (k, v) in entries {
                let Value::Text(key) = k else {
                    return Err(DeserializeError::shape("text", k));
                };
                object.insert(key.clone(), to_json(v)?);
            }
            serde_json::Value::Object(object)
        }
        Value::Record(record) => {
            let mut object = Map::new();
            for (name, v) in &record.fields {
                object.insert(name.clone(), to_json(v)?);
            }
            serde_json::Value::Object(object)
        }
        Value::Raised(inner) => to_json(inner)?,
    })
}
