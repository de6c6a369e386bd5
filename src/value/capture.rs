//! Decomposing Rust values into [`Value`]s and rebuilding them.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::hash::Hash;

use crate::error::{DeserializeError, SerializeError};
use crate::value::{Record, Value};

/// Decompose a value into the wire shape.
pub trait Capture {
    fn capture(&self) -> Result<Value, SerializeError>;
}

/// Rebuild a value from the wire shape.
pub trait Restore: Sized {
    fn restore(value: &Value) -> Result<Self, DeserializeError>;
}

impl<T: Capture + ?Sized> Capture for &T {
    fn capture(&self) -> Result<Value, SerializeError> {
        (**self).capture()
    }
}

impl<T: Capture + ?Sized> Capture for Box<T> {
    fn capture(&self) -> Result<Value, SerializeError> {
        (**self).capture()
    }
}

impl<T: Restore> Restore for Box<T> {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        T::restore(value).map(Box::new)
    }
}

impl Capture for Value {
    fn capture(&self) -> Result<Value, SerializeError> {
        Ok(self.clone())
    }
}

impl Restore for Value {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        Ok(value.clone())
    }
}

impl Capture for Record {
    fn capture(&self) -> Result<Value, SerializeError> {
        Ok(Value::Record(self.clone()))
    }
}

impl Capture for () {
    fn capture(&self) -> Result<Value, SerializeError> {
        Ok(Value::Unit)
    }
}

impl Restore for () {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        match value {
            Value::Unit => Ok(()),
            other => Err(DeserializeError::shape("unit", other)),
        }
    }
}

impl Capture for Infallible {
    fn capture(&self) -> Result<Value, SerializeError> {
        match *self {}
    }
}

impl Capture for bool {
    fn capture(&self) -> Result<Value, SerializeError> {
        Ok(Value::Bool(*self))
    }
}

impl Restore for bool {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(DeserializeError::shape("bool", other)),
        }
    }
}

macro_rules! capture_int {
    ($($ty:ty),*) => {$(
        impl Capture for $ty {
            fn capture(&self) -> Result<Value, SerializeError> {
                i64::try_from(*self)
                    .map(Value::Int)
                    .map_err(|_| SerializeError::IntegerOverflow(self.to_string()))
            }
        }

        impl Restore for $ty {
            fn restore(value: &Value) -> Result<Self, DeserializeError> {
                match value {
                    Value::Int(i) => <$ty>::try_from(*i)
                        .map_err(|_| DeserializeError::OutOfRange(stringify!($ty))),
                    other => Err(DeserializeError::shape("int", other)),
                }
            }
        }
    )*};
}

capture_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Capture for f64 {
    fn capture(&self) -> Result<Value, SerializeError> {
        if !self.is_finite() {
            return Err(SerializeError::unsupported(
                "f64",
                format!("non-finite float {self}"),
            ));
        }
        Ok(Value::Float(*self))
    }
}

impl Restore for f64 {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        match value {
            Value::Float(x) => Ok(*x),
            other => Err(DeserializeError::shape("float", other)),
        }
    }
}

impl Capture for f32 {
    fn capture(&self) -> Result<Value, SerializeError> {
        f64::from(*self).capture()
    }
}

impl Restore for f32 {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        f64::restore(value).map(|x| x as f32)
    }
}

impl Capture for char {
    fn capture(&self) -> Result<Value, SerializeError> {
        Ok(Value::Text(self.to_string()))
    }
}

impl Restore for char {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        let Value::Text(s) = value else {
            return Err(DeserializeError::shape("text", value));
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(DeserializeError::OutOfRange("char")),
        }
    }
}

impl Capture for str {
    fn capture(&self) -> Result<Value, SerializeError> {
        Ok(Value::Text(self.to_string()))
    }
}

impl Capture for String {
    fn capture(&self) -> Result<Value, SerializeError> {
        self.as_str().capture()
    }
}

impl Restore for String {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(DeserializeError::shape("text", other)),
        }
    }
}

impl<T: Capture> Capture for [T] {
    fn capture(&self) -> Result<Value, SerializeError> {
        self.iter()
            .map(Capture::capture)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Seq)
    }
}

impl<T: Capture> Capture for Vec<T> {
    fn capture(&self) -> Result<Value, SerializeError> {
        self.as_slice().capture()
    }
}

impl<T: Restore> Restore for Vec<T> {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        match value {
            Value::Seq(items) => items.iter().map(T::restore).collect(),
            other => Err(DeserializeError::shape("sequence", other)),
        }
    }
}

/// `None` is captured as unit; `Some(x)` as `x` itself.
impl<T: Capture> Capture for Option<T> {
    fn capture(&self) -> Result<Value, SerializeError> {
        match self {
            Some(inner) => inner.capture(),
            None => Ok(Value::Unit),
        }
    }
}

impl<T: Restore> Restore for Option<T> {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        match value {
            Value::Unit => Ok(None),
            other => T::restore(other).map(Some),
        }
    }
}

fn capture_entries<'a, K, V>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
) -> Result<Value, SerializeError>
where
    K: Capture + 'a,
    V: Capture + 'a,
{
    entries
        .map(|(k, v)| Ok((k.capture()?, v.capture()?)))
        .collect::<Result<Vec<_>, SerializeError>>()
        .map(Value::Map)
}

fn restore_entries<K: Restore, V: Restore>(
    value: &Value,
) -> Result<Vec<(K, V)>, DeserializeError> {
    match value {
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| Ok((K::restore(k)?, V::restore(v)?)))
            .collect(),
        other => Err(DeserializeError::shape("mapping", other)),
    }
}

impl<K: Capture, V: Capture, S> Capture for HashMap<K, V, S> {
    fn capture(&self) -> Result<Value, SerializeError> {
        capture_entries(self.iter())
    }
}

impl<K: Restore + Eq + Hash, V: Restore> Restore for HashMap<K, V> {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        Ok(restore_entries(value)?.into_iter().collect())
    }
}

impl<K: Capture, V: Capture> Capture for BTreeMap<K, V> {
    fn capture(&self) -> Result<Value, SerializeError> {
        capture_entries(self.iter())
    }
}

impl<K: Restore + Ord, V: Restore> Restore for BTreeMap<K, V> {
    fn restore(value: &Value) -> Result<Self, DeserializeError> {
        Ok(restore_entries(value)?.into_iter().collect())
    }
}

macro_rules! capture_tuple {
    ($len:literal => $($name:ident : $idx:tt),+) => {
        impl<$($name: Capture),+> Capture for ($($name,)+) {
            fn capture(&self) -> Result<Value, SerializeError> {
                Ok(Value::Seq(vec![$(self.$idx.capture()?),+]))
            }
        }

        impl<$($name: Restore),+> Restore for ($($name,)+) {
            fn restore(value: &Value) -> Result<Self, DeserializeError> {
                match value {
                    Value::Seq(items) if items.len() == $len => {
                        Ok(($($name::restore(&items[$idx])?,)+))
                    }
                    Value::Seq(_) => Err(DeserializeError::OutOfRange(concat!("tuple of ", $len))),
                    other => Err(DeserializeError::shape("sequence", other)),
                }
            }
        }
    };
}

capture_tuple!(1 => A: 0);
capture_tuple!(2 => A: 0, B: 1);
capture_tuple!(3 => A: 0, B: 1, C: 2);
capture_tuple!(4 => A: 0, B: 1, C: 2, D: 3);
capture_tuple!(5 => A: 0, B: 1, C: 2, D: 3, E: 4);
capture_tuple!(6 => A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Implement [`Capture`] and [`Restore`] for a struct with named fields.
///
/// The struct is captured as a [`Record`] named after the type; restoring
/// checks the name, so a payload recorded for another type is rejected
/// instead of silently rebuilt.
///
/// ```
/// use varsnap::record;
///
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// record!(Point { x, y });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::value::Capture for $ty {
            fn capture(
                &self,
            ) -> ::std::result::Result<$crate::value::Value, $crate::error::SerializeError> {
                #[allow(unused_mut)]
                let mut record = $crate::value::Record::new(stringify!($ty));
                $(
                    record.push(
                        stringify!($field),
                        $crate::value::Capture::capture(&self.$field)?,
                    );
                )*
                Ok($crate::value::Value::Record(record))
            }
        }

        impl $crate::value::Restore for $ty {
            fn restore(
                value: &$crate::value::Value,
            ) -> ::std::result::Result<Self, $crate::error::DeserializeError> {
                #[allow(unused_variables)]
                let fields = $crate::value::Fields::of(value, stringify!($ty))?;
                Ok(Self {
                    $($field: fields.restore(stringify!($field))?,)*
                })
            }
        }
    };
}
