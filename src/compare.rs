//! Structural equality between two captured values.

use crate::value::{Shape, Value};

/// Compare two values for semantic equality.
///
/// Values of different kinds never compare equal, even when they render the
/// same (`1` vs `"1"`). Sequences compare element-wise in order, mappings by
/// key set regardless of order, records by type name and then by their fields
/// as a mapping. A raised error only equals another raised error.
///
/// Values are owned trees, so recursion always terminates.
pub fn equal(a: &Value, b: &Value) -> bool {
    if !compatible(a, b) {
        return false;
    }

    match (a.shape(), b.shape()) {
        (Shape::Scalar(x), Shape::Scalar(y)) => scalar_equal(x, y),
        (Shape::Sequence(xs), Shape::Sequence(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equal(x, y))
        }
        (Shape::Mapping(xs), Shape::Mapping(ys)) => mapping_equal(xs, ys),
        (Shape::Record(x), Shape::Record(y)) => {
            x.type_name == y.type_name
                && x.fields.len() == y.fields.len()
                && x.fields.iter().all(|(name, value)| match y.get(name) {
                    Some(other) => equal(value, other),
                    None => false,
                })
        }
        _ => false,
    }
}

/// Same variant at this level, and for raised errors, at the carried level.
fn compatible(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Raised(x), Value::Raised(y)) => compatible(x, y),
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

fn scalar_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

fn mapping_equal(xs: &[(Value, Value)], ys: &[(Value, Value)]) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    xs.iter().all(|(key, value)| {
        ys.iter()
            .find(|(other_key, _)| equal(key, other_key))
            .is_some_and(|(_, other)| equal(value, other))
    })
}
