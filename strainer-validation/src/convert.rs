// Kind coercion and cross-kind comparison

use crate::value::{Kind, Value};
use std::cmp::Ordering;

/// Best-effort conversion of `value` to `kind`.
///
/// References are dereferenced first. Strings are trimmed before being
/// parsed as numbers or booleans. `None` means the value cannot be
/// represented in the requested kind.
pub fn to_kind(value: &Value, kind: Kind) -> Option<Value> {
    if kind == Kind::Any {
        return Some(value.clone());
    }

    let value = value.inner();
    if value.kind() == kind {
        return Some(value.clone());
    }

    match kind {
        Kind::Any => Some(value.clone()),
        Kind::Null => None,
        Kind::String => to_string(value).map(Value::String),
        Kind::Int => to_i64(value).map(Value::Int),
        Kind::Uint => to_u64(value).map(Value::Uint),
        Kind::Float => to_f64(value).map(Value::Float),
        Kind::Bool => to_bool(value).map(Value::Bool),
        Kind::List | Kind::Map => None,
    }
}

/// Scalar to string. Collections have no string form.
pub fn to_string(value: &Value) -> Option<String> {
    match value.inner() {
        Value::Null => Some(String::new()),
        Value::List(_) | Value::Map(_) => None,
        other => Some(other.to_string()),
    }
}

pub fn to_i64(value: &Value) -> Option<i64> {
    match value.inner() {
        Value::Int(n) => Some(*n),
        Value::Uint(n) => i64::try_from(*n).ok(),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

pub fn to_u64(value: &Value) -> Option<u64> {
    match value.inner() {
        Value::Uint(n) => Some(*n),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        other => to_i64(other).and_then(|n| u64::try_from(n).ok()),
    }
}

pub fn to_f64(value: &Value) -> Option<f64> {
    match value.inner() {
        Value::Int(n) => Some(*n as f64),
        Value::Uint(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn to_bool(value: &Value) -> Option<bool> {
    match value.inner() {
        Value::Bool(b) => Some(*b),
        Value::Int(0) | Value::Uint(0) => Some(false),
        Value::Int(1) | Value::Uint(1) => Some(true),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Parse the usual textual booleans.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "yes" | "true" => Some(true),
        "0" | "off" | "no" | "false" | "" => Some(false),
        _ => None,
    }
}

/// Numeric view used by the comparison helpers.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Self> {
        match value.inner() {
            Value::Int(n) => Some(Number::Int(i128::from(*n))),
            Value::Uint(n) => Some(Number::Int(i128::from(*n))),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::String(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i128>() {
                    Some(Number::Int(n))
                } else {
                    s.parse::<f64>().ok().map(Number::Float)
                }
            }
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    fn cmp(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

/// Numeric comparison across kinds. Numeric strings take part.
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    Number::of(a)?.cmp(Number::of(b)?)
}

/// General ordering: numeric when both sides are numeric, else string-wise.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let Some(ord) = compare_numbers(a, b) {
        return Some(ord);
    }
    match (a.inner(), b.inner()) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Loose equality: structural, then numeric, then textual for scalars.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    let (a, b) = (a.inner(), b.inner());
    if a == b {
        return true;
    }
    if (a.kind().is_numeric() || b.kind().is_numeric())
        && compare_numbers(a, b) == Some(Ordering::Equal)
    {
        return true;
    }
    if a.is_scalar() && b.is_scalar() && !a.is_null() && !b.is_null() {
        return a.to_string() == b.to_string();
    }
    false
}

/// `value >= min`
pub fn gte(value: &Value, min: &Value) -> bool {
    matches!(compare_numbers(value, min), Some(Ordering::Greater | Ordering::Equal))
}

/// `value <= max`
pub fn lte(value: &Value, max: &Value) -> bool {
    matches!(compare_numbers(value, max), Some(Ordering::Less | Ordering::Equal))
}

/// `value > other`
pub fn gt(value: &Value, other: &Value) -> bool {
    compare_numbers(value, other) == Some(Ordering::Greater)
}

/// `value < other`
pub fn lt(value: &Value, other: &Value) -> bool {
    compare_numbers(value, other) == Some(Ordering::Less)
}

/// `min <= value <= max`
pub fn between(value: &Value, min: &Value, max: &Value) -> bool {
    gte(value, min) && lte(value, max)
}

/// Length of a string (in characters) or a collection.
pub fn length(value: &Value) -> Option<usize> {
    match value.inner() {
        Value::String(s) => Some(s.chars().count()),
        Value::List(items) => Some(items.len()),
        Value::Map(map) => Some(map.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_kind_numbers() {
        assert_eq!(to_kind(&Value::from("50 "), Kind::Int), Some(Value::Int(50)));
        assert_eq!(to_kind(&Value::from("5.0"), Kind::Int), Some(Value::Int(5)));
        assert_eq!(to_kind(&Value::from("5.5"), Kind::Int), None);
        assert_eq!(to_kind(&Value::from(-3), Kind::Uint), None);
        assert_eq!(to_kind(&Value::from(3), Kind::Float), Some(Value::Float(3.0)));
    }

    #[test]
    fn test_to_kind_strings_and_bools() {
        assert_eq!(to_kind(&Value::from(12), Kind::String), Some(Value::from("12")));
        assert_eq!(to_kind(&Value::from("on"), Kind::Bool), Some(Value::Bool(true)));
        assert_eq!(to_kind(&Value::from("maybe"), Kind::Bool), None);
        assert_eq!(to_kind(&Value::from(vec![1]), Kind::String), None);
    }

    #[test]
    fn test_to_kind_dereferences() {
        let value = Value::from(Some(7));
        assert_eq!(to_kind(&value, Kind::Int), Some(Value::Int(7)));
        assert_eq!(to_kind(&value, Kind::Any), Some(value.clone()));
    }

    #[test]
    fn test_compare_across_kinds() {
        assert!(gte(&Value::Int(45), &Value::from("1")));
        assert!(lt(&Value::Uint(3), &Value::Float(3.5)));
        assert!(between(&Value::from("7"), &Value::Int(1), &Value::Int(10)));
        assert!(!gte(&Value::from("abc"), &Value::Int(1)));
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&Value::Int(1), &Value::from("1")));
        assert!(loose_eq(&Value::from("a"), &Value::from("a")));
        assert!(loose_eq(&Value::Bool(true), &Value::from("true")));
        assert!(!loose_eq(&Value::from("a"), &Value::from("b")));
        assert!(!loose_eq(&Value::Null, &Value::from("")));
    }

    #[test]
    fn test_length_counts_chars() {
        assert_eq!(length(&Value::from("héllo")), Some(5));
        assert_eq!(length(&Value::from(vec![1, 2])), Some(2));
        assert_eq!(length(&Value::Int(5)), None);
    }
}
