// Dynamic values flowing through filters and validators

use crate::convert;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A field value read from a data source.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or null (a `None` field, a JSON `null`)
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A present nullable value, e.g. `Some(0)` of an `Option<i64>` field.
    ///
    /// Never empty, whatever it points at.
    Ref(Box<Value>),
}

/// Kind tag of a [`Value`], also used to declare function parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Accepts every value without conversion
    Any,
    Null,
    Bool,
    Int,
    Uint,
    Float,
    String,
    List,
    Map,
}

impl Kind {
    /// Get kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Any => "any",
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::List => "list",
            Kind::Map => "map",
        }
    }

    /// Whether the kind is one of the numeric kinds.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Kind::Int | Kind::Uint | Kind::Float)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Kind of the value, looking through [`Value::Ref`].
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Uint(_) => Kind::Uint,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Ref(inner) => inner.kind(),
        }
    }

    /// The value behind any number of [`Value::Ref`] layers.
    pub fn inner(&self) -> &Value {
        match self {
            Value::Ref(inner) => inner.inner(),
            other => other,
        }
    }

    /// Owned version of [`Value::inner`].
    pub fn into_inner(self) -> Value {
        match self {
            Value::Ref(inner) => inner.into_inner(),
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Emptiness as seen by `required` and the skip-empty policy.
    ///
    /// Null, zero numbers, `false`, empty strings and empty collections are
    /// empty. A [`Value::Ref`] is present even when it points at a zero.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(n) => *n == 0,
            Value::Uint(n) => *n == 0,
            Value::Float(n) => *n == 0.0,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Ref(_) => false,
        }
    }

    /// Whether the value is a single scalar (not a collection).
    pub fn is_scalar(&self) -> bool {
        !matches!(self.inner(), Value::List(_) | Value::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.inner() {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.inner() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `Int` and in-range `Uint` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self.inner() {
            Value::Int(n) => Some(*n),
            Value::Uint(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Float view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self.inner() {
            Value::Int(n) => Some(*n as f64),
            Value::Uint(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self.inner() {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self.inner() {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Coerce to `T`, converting between kinds where possible.
    ///
    /// ```
    /// use strainer_validation::Value;
    ///
    /// assert_eq!(Value::from(" 42").to::<i64>(), Some(42));
    /// assert_eq!(Value::from("abc").to::<i64>(), None);
    /// ```
    pub fn to<T: Param>(&self) -> Option<T> {
        match convert::to_kind(self, T::KIND) {
            Some(converted) => T::from_value(&converted),
            // lets `Option<T>` targets take a null
            None if self.is_null() => T::from_value(self),
            None => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Uint(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(_) => write!(f, "{}", serde_json::Value::from(self.clone())),
            Value::Ref(inner) => write!(f, "{}", inner),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Uint(n) => serializer.serialize_u64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
            Value::Ref(inner) => inner.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// Conversions into Value

macro_rules! impl_from_int {
    ($variant:ident: $target:ty => $($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::$variant(n as $target)
                }
            }
        )+
    };
}

impl_from_int!(Int: i64 => i8, i16, i32, i64, isize);
impl_from_int!(Uint: u64 => u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Value::Ref(Box::new(v.into())),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(map: HashMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::from(n),
            Value::Uint(n) => serde_json::Value::from(n),
            Value::Float(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Ref(inner) => serde_json::Value::from(*inner),
        }
    }
}

// Typed extraction

/// A Rust type that a registered function can take as a parameter.
///
/// `KIND` is recorded in the function's metadata at registration time and
/// drives argument coercion before each call.
pub trait Param: Sized {
    /// Declared kind of the parameter.
    const KIND: Kind;

    /// Whether the parameter swallows all remaining arguments.
    const VARIADIC: bool = false;

    /// Extract from an already-coerced value.
    fn from_value(value: &Value) -> Option<Self>;

    /// Extract the parameter at `index` from a call's argument list.
    fn extract(args: &[Value], index: usize) -> Option<Self> {
        args.get(index).and_then(Self::from_value)
    }
}

impl Param for Value {
    const KIND: Kind = Kind::Any;

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl Param for String {
    const KIND: Kind = Kind::String;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl Param for bool {
    const KIND: Kind = Kind::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Param for i64 {
    const KIND: Kind = Kind::Int;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl Param for i32 {
    const KIND: Kind = Kind::Int;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|n| i32::try_from(n).ok())
    }
}

impl Param for u64 {
    const KIND: Kind = Kind::Uint;

    fn from_value(value: &Value) -> Option<Self> {
        match value.inner() {
            Value::Uint(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl Param for usize {
    const KIND: Kind = Kind::Uint;

    fn from_value(value: &Value) -> Option<Self> {
        u64::from_value(value).and_then(|n| usize::try_from(n).ok())
    }
}

impl Param for f64 {
    const KIND: Kind = Kind::Float;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl<T: Param> Param for Vec<T> {
    const KIND: Kind = Kind::List;

    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_list()?
            .iter()
            .map(|item| convert::to_kind(item, T::KIND).and_then(|v| T::from_value(&v)))
            .collect()
    }
}

impl Param for BTreeMap<String, Value> {
    const KIND: Kind = Kind::Map;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_map().cloned()
    }
}

impl<T: Param> Param for Option<T> {
    const KIND: Kind = T::KIND;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            Value::Ref(inner) => T::from_value(inner).map(Some),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Trailing parameter collecting every remaining argument.
///
/// ```
/// use strainer_validation::{ValidatorFunc, Variadic};
///
/// let one_of = ValidatorFunc::new(|v: String, Variadic(opts): Variadic<String>| opts.contains(&v));
/// assert!(one_of.meta().variadic);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variadic<T>(pub Vec<T>);

impl<T: Param> Param for Variadic<T> {
    const KIND: Kind = T::KIND;
    const VARIADIC: bool = true;

    fn from_value(value: &Value) -> Option<Self> {
        T::from_value(value).map(|v| Variadic(vec![v]))
    }

    fn extract(args: &[Value], index: usize) -> Option<Self> {
        args.get(index..)
            .unwrap_or_default()
            .iter()
            .map(T::from_value)
            .collect::<Option<Vec<_>>>()
            .map(Variadic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::from(0).is_empty());
        assert!(Value::from(false).is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(!Value::from("a").is_empty());
        assert!(!Value::from(Some(0)).is_empty());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::Ref(Box::new(Value::Int(3))));
        assert_eq!(Value::from(Some(3)).kind(), Kind::Int);
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"name": "tom", "age": 20, "tags": ["a", "b"], "x": null});
        let value = Value::from(json.clone());

        let map = value.as_map().unwrap();
        assert_eq!(map.get("age"), Some(&Value::Int(20)));
        assert_eq!(map.get("x"), Some(&Value::Null));
        assert_eq!(serde_json::Value::from(value), json);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[a, b]");
        assert_eq!(Value::from(Some("x")).to_string(), "x");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_param_extraction() {
        assert_eq!(i64::from_value(&Value::Uint(5)), Some(5));
        assert_eq!(u64::from_value(&Value::Int(-1)), None);
        assert_eq!(f64::from_value(&Value::Int(2)), Some(2.0));
        assert_eq!(Option::<i64>::from_value(&Value::Null), Some(None));
        assert_eq!(
            Vec::<i64>::from_value(&Value::from(vec!["1", "2"])),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn test_variadic_extract() {
        let args = vec![Value::from("a"), Value::from("b"), Value::from("c")];
        let Variadic(rest) = Variadic::<String>::extract(&args, 1).unwrap();
        assert_eq!(rest, vec!["b".to_string(), "c".to_string()]);

        let Variadic(none) = Variadic::<String>::extract(&args, 3).unwrap();
        assert!(none.is_empty());
    }
}
