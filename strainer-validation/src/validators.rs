// Built-in validators

use crate::convert::{self, loose_eq};
use crate::errors::Error;
use crate::registry::{FuncMeta, Registry, ValidatorFunc};
use crate::source::DataKind;
use crate::validation::Validation;
use crate::value::{Kind, Value};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

// Common regex patterns
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$").unwrap()
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

static ALPHA_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]+$").unwrap());

static ALPHANUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());

static ALPHADASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

// Patterns from `regexp` rules, compiled once per distinct pattern
static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(Default::default);

const ANY: (Kind, bool) = (Kind::Any, false);
const ANY_REST: (Kind, bool) = (Kind::Any, true);
const STR: (Kind, bool) = (Kind::String, false);
const STR_REST: (Kind, bool) = (Kind::String, true);
const UINT: (Kind, bool) = (Kind::Uint, false);
const UINT_REST: (Kind, bool) = (Kind::Uint, true);

/// Explicitly dispatched validators and their parameters (value first).
const FAST_PATH: &[(&str, &[(Kind, bool)])] = &[
    ("required", &[ANY]),
    ("requiredIf", &[ANY, STR, ANY_REST]),
    ("requiredUnless", &[ANY, STR, ANY_REST]),
    ("requiredWith", &[ANY, STR_REST]),
    ("requiredWithAll", &[ANY, STR_REST]),
    ("requiredWithout", &[ANY, STR_REST]),
    ("requiredWithoutAll", &[ANY, STR_REST]),
    ("min", &[ANY, ANY]),
    ("max", &[ANY, ANY]),
    ("lt", &[ANY, ANY]),
    ("gt", &[ANY, ANY]),
    ("between", &[ANY, ANY, ANY]),
    ("length", &[ANY, UINT]),
    ("minLength", &[ANY, UINT]),
    ("maxLength", &[ANY, UINT]),
    ("stringLength", &[ANY, UINT, UINT_REST]),
    ("enum", &[ANY, ANY_REST]),
    ("notIn", &[ANY, ANY_REST]),
    ("regexp", &[STR, STR]),
    ("isEqual", &[ANY, ANY]),
    ("notEqual", &[ANY, ANY]),
    ("eqField", &[ANY, STR]),
    ("neField", &[ANY, STR]),
    ("gtField", &[ANY, STR]),
    ("gteField", &[ANY, STR]),
    ("ltField", &[ANY, STR]),
    ("lteField", &[ANY, STR]),
    ("isFile", &[ANY]),
    ("isImage", &[ANY, STR_REST]),
    ("inMimeTypes", &[ANY, STR_REST]),
];

/// Metadata of an explicitly dispatched validator.
pub fn fast_path_meta(name: &str) -> Option<FuncMeta> {
    FAST_PATH
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(n, params)| {
            let mut meta = FuncMeta::from_params(params, false);
            meta.name = n.to_string();
            meta.builtin = true;
            meta
        })
}

/// `required` and its conditional variants.
pub fn is_required_family(name: &str) -> bool {
    name.starts_with("required")
}

/// Validators that inspect uploaded files rather than field values.
pub fn is_file_validator(name: &str) -> bool {
    matches!(name, "isFile" | "isImage" | "inMimeTypes")
}

/// Run an explicitly dispatched validator.
///
/// `args` are already coerced to the declared kinds. Returns `None` when
/// `name` has no fast path.
pub(crate) fn fast_path(
    session: &Validation<'_>,
    name: &str,
    field: &str,
    value: &Value,
    args: &[Value],
) -> Option<bool> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let str_args = || args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
    let present = |f: &str| session.get(f).is_some_and(|v| !v.is_empty());

    let passed = match name {
        "required" => required(value),
        "requiredIf" | "requiredUnless" => {
            let other = session.get(&arg(0).to_string()).unwrap_or_default();
            let matched = args.iter().skip(1).any(|a| loose_eq(&other, a));
            let applies = if name == "requiredIf" { matched } else { !matched };
            !applies || required(value)
        }
        "requiredWith" => !str_args().iter().any(|f| present(f.as_str())) || required(value),
        "requiredWithAll" => {
            let fields = str_args();
            fields.is_empty() || !fields.iter().all(|f| present(f.as_str())) || required(value)
        }
        "requiredWithout" => !str_args().iter().any(|f| !present(f.as_str())) || required(value),
        "requiredWithoutAll" => str_args().iter().any(|f| present(f.as_str())) || required(value),
        "min" => convert::gte(value, &arg(0)),
        "max" => convert::lte(value, &arg(0)),
        "lt" => convert::lt(value, &arg(0)),
        "gt" => convert::gt(value, &arg(0)),
        "between" => convert::between(value, &arg(0), &arg(1)),
        "length" => length_of(value) == arg(0).as_i64().map(|n| n as usize),
        "minLength" => length_cmp(value, &arg(0), |len, n| len >= n),
        "maxLength" => length_cmp(value, &arg(0), |len, n| len <= n),
        "stringLength" => {
            length_cmp(value, &arg(0), |len, n| len >= n)
                && (args.len() < 2 || length_cmp(value, &arg(1), |len, n| len <= n))
        }
        "enum" => in_set(value, &args),
        "notIn" => !in_set_any(value, &args),
        "regexp" => matches_pattern(&value.to_string(), &arg(0).to_string()),
        "isEqual" => loose_eq(value, &arg(0)),
        "notEqual" => !loose_eq(value, &arg(0)),
        "eqField" | "neField" | "gtField" | "gteField" | "ltField" | "lteField" => {
            let other = session.get(&arg(0).to_string());
            compare_field(name, value, other.as_ref())
        }
        "isFile" | "isImage" | "inMimeTypes" => check_file(session, name, field, &str_args()),
        _ => return None,
    };

    Some(passed)
}

/// Not null, not zero, not zero-length; a present nullable always passes.
///
/// Whitespace counts as content. Pair with the `trim` filter to reject
/// blank input.
pub fn required(value: &Value) -> bool {
    !value.is_empty()
}

fn length_of(value: &Value) -> Option<usize> {
    convert::length(value).or_else(|| match value.inner() {
        Value::Int(_) | Value::Uint(_) | Value::Float(_) => Some(value.to_string().chars().count()),
        _ => None,
    })
}

fn length_cmp(value: &Value, bound: &Value, cmp: impl Fn(usize, usize) -> bool) -> bool {
    match (length_of(value), bound.as_i64()) {
        (Some(len), Some(n)) if n >= 0 => cmp(len, n as usize),
        _ => false,
    }
}

fn in_set(value: &Value, set: &[Value]) -> bool {
    match value.inner() {
        Value::List(items) => items.iter().all(|item| set.iter().any(|s| loose_eq(item, s))),
        other => set.iter().any(|s| loose_eq(other, s)),
    }
}

fn in_set_any(value: &Value, set: &[Value]) -> bool {
    match value.inner() {
        Value::List(items) => items.iter().any(|item| set.iter().any(|s| loose_eq(item, s))),
        other => set.iter().any(|s| loose_eq(other, s)),
    }
}

/// Match against a pattern from a rule, compiling it on first use.
///
/// # Panics
///
/// Panics when the pattern is not a valid regular expression.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    let mut cache = PATTERN_CACHE.lock();
    if let Some(re) = cache.get(pattern) {
        return re.is_match(value);
    }

    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("{}", Error::InvalidRule(format!("bad regexp '{}': {}", pattern, e))),
    };
    let matched = re.is_match(value);
    cache.insert(pattern.to_string(), re);
    matched
}

fn compare_field(name: &str, value: &Value, other: Option<&Value>) -> bool {
    let Some(other) = other else {
        return name == "neField";
    };

    match name {
        "eqField" => loose_eq(value, other),
        "neField" => !loose_eq(value, other),
        _ => {
            let Some(ord) = convert::compare(value, other) else {
                return false;
            };
            match name {
                "gtField" => ord == Ordering::Greater,
                "gteField" => ord != Ordering::Less,
                "ltField" => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            }
        }
    }
}

fn check_file(session: &Validation<'_>, name: &str, field: &str, args: &[String]) -> bool {
    if session.data_kind() != DataKind::Form {
        tracing::warn!(
            field,
            validator = name,
            source = %session.data_kind(),
            "file validator used on a non-form data source"
        );
        return false;
    }

    let Some(file) = session.files().and_then(|files| files.get(field)) else {
        return false;
    };

    match name {
        "isFile" => true,
        "isImage" => {
            file.is_image()
                && (args.is_empty()
                    || file
                        .extension()
                        .is_some_and(|ext| args.iter().any(|a| a.eq_ignore_ascii_case(&ext))))
        }
        _ => args.iter().any(|mime| mime.eq_ignore_ascii_case(file.mime())),
    }
}

// Registry builtins

fn is_int(value: Value) -> bool {
    match value.inner() {
        Value::Int(_) => true,
        Value::Uint(n) => i64::try_from(*n).is_ok(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_uint(value: Value) -> bool {
    match value.inner() {
        Value::Uint(_) => true,
        Value::Int(n) => *n >= 0,
        Value::String(s) => s.trim().parse::<u64>().is_ok(),
        _ => false,
    }
}

fn is_float(value: Value) -> bool {
    match value.inner() {
        Value::Float(_) | Value::Int(_) | Value::Uint(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

fn is_bool(value: Value) -> bool {
    match value.inner() {
        Value::Bool(_) => true,
        Value::String(s) => !s.trim().is_empty() && convert::parse_bool(s).is_some(),
        _ => false,
    }
}

fn is_number(value: Value) -> bool {
    match value.inner() {
        Value::Int(_) | Value::Uint(_) | Value::Float(_) => true,
        Value::String(s) => NUMERIC_REGEX.is_match(s),
        _ => false,
    }
}

fn contains(haystack: Value, needle: Value) -> bool {
    match haystack.inner() {
        Value::String(s) => s.contains(&needle.to_string()),
        Value::List(items) => items.iter().any(|item| loose_eq(item, &needle)),
        Value::Map(map) => map.contains_key(&needle.to_string()),
        _ => false,
    }
}

pub(crate) fn register_builtins(registry: &mut Registry) {
    let builtins: Vec<(&str, ValidatorFunc)> = vec![
        ("isInt", ValidatorFunc::new(is_int)),
        ("isUint", ValidatorFunc::new(is_uint)),
        ("isFloat", ValidatorFunc::new(is_float)),
        ("isBool", ValidatorFunc::new(is_bool)),
        ("isNumber", ValidatorFunc::new(is_number)),
        ("isString", ValidatorFunc::new(|v: Value| matches!(v.inner(), Value::String(_)))),
        ("isSlice", ValidatorFunc::new(|v: Value| matches!(v.inner(), Value::List(_)))),
        ("isMap", ValidatorFunc::new(|v: Value| matches!(v.inner(), Value::Map(_)))),
        (
            "isInts",
            ValidatorFunc::new(|v: Value| {
                v.as_list().is_some_and(|items| {
                    items
                        .iter()
                        .all(|i| matches!(i.kind(), Kind::Int | Kind::Uint))
                })
            }),
        ),
        (
            "isStrings",
            ValidatorFunc::new(|v: Value| {
                v.as_list()
                    .is_some_and(|items| items.iter().all(|i| i.kind() == Kind::String))
            }),
        ),
        ("isAlpha", ValidatorFunc::new(|s: String| ALPHA_REGEX.is_match(&s))),
        ("isAlphaNum", ValidatorFunc::new(|s: String| ALPHANUMERIC_REGEX.is_match(&s))),
        ("isAlphaDash", ValidatorFunc::new(|s: String| ALPHADASH_REGEX.is_match(&s))),
        ("isEmail", ValidatorFunc::new(|s: String| EMAIL_REGEX.is_match(&s))),
        ("isURL", ValidatorFunc::new(|s: String| URL_REGEX.is_match(&s))),
        ("isUUID", ValidatorFunc::new(|s: String| UUID_REGEX.is_match(&s))),
        ("isIP", ValidatorFunc::new(|s: String| s.parse::<IpAddr>().is_ok())),
        ("isIPv4", ValidatorFunc::new(|s: String| s.parse::<Ipv4Addr>().is_ok())),
        ("isIPv6", ValidatorFunc::new(|s: String| s.parse::<Ipv6Addr>().is_ok())),
        (
            "isJSON",
            ValidatorFunc::new(|s: String| serde_json::from_str::<serde_json::Value>(&s).is_ok()),
        ),
        ("contains", ValidatorFunc::new(contains)),
        ("notContains", ValidatorFunc::new(|h: Value, n: Value| !contains(h, n))),
        ("startsWith", ValidatorFunc::new(|s: String, p: String| s.starts_with(&p))),
        ("endsWith", ValidatorFunc::new(|s: String, p: String| s.ends_with(&p))),
    ];

    for (name, func) in builtins {
        registry.insert_builtin_validator(name, func);
    }
}
