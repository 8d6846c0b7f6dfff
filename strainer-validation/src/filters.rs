// Built-in filters

use crate::convert;
use crate::registry::{FilterFunc, Registry};
use crate::value::{Value, Variadic};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

fn trim_with(s: &str, chars: &[String], left: bool, right: bool) -> String {
    let set: Vec<char> = chars.iter().flat_map(|c| c.chars()).collect();
    let is_cut = |c: char| {
        if set.is_empty() {
            c.is_whitespace()
        } else {
            set.contains(&c)
        }
    };

    let mut out = s;
    if left {
        out = out.trim_start_matches(is_cut);
    }
    if right {
        out = out.trim_end_matches(is_cut);
    }
    out.to_string()
}

fn to_int(value: Value) -> Result<i64, String> {
    convert::to_i64(&value).ok_or_else(|| format!("cannot convert '{}' to int", value))
}

fn to_uint(value: Value) -> Result<u64, String> {
    convert::to_u64(&value).ok_or_else(|| format!("cannot convert '{}' to uint", value))
}

fn to_float(value: Value) -> Result<f64, String> {
    convert::to_f64(&value).ok_or_else(|| format!("cannot convert '{}' to float", value))
}

fn to_bool(value: Value) -> Result<bool, String> {
    convert::to_bool(&value).ok_or_else(|| format!("cannot convert '{}' to bool", value))
}

fn to_string(value: Value) -> Result<String, String> {
    convert::to_string(&value).ok_or_else(|| format!("cannot convert a {} to string", value.kind()))
}

fn abs(value: Value) -> Result<Value, String> {
    match value.inner() {
        Value::Int(n) => Ok(Value::Int(n.saturating_abs())),
        Value::Uint(n) => Ok(Value::Uint(*n)),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Ok(Value::Int(n.saturating_abs())),
            Err(_) => s
                .trim()
                .parse::<f64>()
                .map(|f| Value::Float(f.abs()))
                .map_err(|e| e.to_string()),
        },
        other => Err(format!("cannot take abs of a {}", other.kind())),
    }
}

fn map_first(s: &str, f: impl FnOnce(char) -> String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => f(first) + chars.as_str(),
        None => String::new(),
    }
}

fn uc_first(s: String) -> String {
    map_first(&s, |c| c.to_uppercase().collect())
}

fn lc_first(s: String) -> String {
    map_first(&s, |c| c.to_lowercase().collect())
}

fn uc_word(s: String) -> String {
    s.split(' ')
        .map(|word| map_first(word, |c| c.to_uppercase().collect()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `HelloWorld` / `hello-world` -> `hello_world`
fn snake_case(s: String, sep: Variadic<String>) -> String {
    let sep = sep.0.first().map(String::as_str).unwrap_or("_");
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c == '-' || c == '_' || c == ' ' {
            if !out.is_empty() && !out.ends_with(sep) {
                out.push_str(sep);
            }
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower {
                out.push_str(sep);
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// `hello_world` / `hello-world` -> `helloWorld`
fn camel_case(s: String) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;

    for c in s.chars() {
        if c == '-' || c == '_' || c == ' ' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_html(s: String) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn str_to_slice(s: String, sep: Variadic<String>) -> Vec<String> {
    let sep = sep.0.first().map(String::as_str).unwrap_or(",");
    s.split(sep)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn str_to_ints(s: String) -> Result<Vec<i64>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<i64>().map_err(|e| format!("'{}': {}", part, e)))
        .collect()
}

pub(crate) fn register_builtins(registry: &mut Registry) {
    let builtins: Vec<(&str, FilterFunc)> = vec![
        (
            "trim",
            FilterFunc::new(|s: String, c: Variadic<String>| trim_with(&s, &c.0, true, true)),
        ),
        (
            "ltrim",
            FilterFunc::new(|s: String, c: Variadic<String>| trim_with(&s, &c.0, true, false)),
        ),
        (
            "rtrim",
            FilterFunc::new(|s: String, c: Variadic<String>| trim_with(&s, &c.0, false, true)),
        ),
        ("int", FilterFunc::new(to_int)),
        ("uint", FilterFunc::new(to_uint)),
        ("float", FilterFunc::new(to_float)),
        ("bool", FilterFunc::new(to_bool)),
        ("toString", FilterFunc::new(to_string)),
        ("abs", FilterFunc::new(abs)),
        ("lower", FilterFunc::new(|s: String| s.to_lowercase())),
        ("upper", FilterFunc::new(|s: String| s.to_uppercase())),
        ("ucFirst", FilterFunc::new(uc_first)),
        ("lcFirst", FilterFunc::new(lc_first)),
        ("ucWord", FilterFunc::new(uc_word)),
        ("snakeCase", FilterFunc::new(snake_case)),
        ("camelCase", FilterFunc::new(camel_case)),
        (
            "stripTags",
            FilterFunc::new(|s: String| TAG_REGEX.replace_all(&s, "").into_owned()),
        ),
        ("escapeHtml", FilterFunc::new(escape_html)),
        (
            "urlEncode",
            FilterFunc::new(|s: String| urlencoding::encode(&s).into_owned()),
        ),
        (
            "urlDecode",
            FilterFunc::new(|s: String| urlencoding::decode(&s).map(|d| d.into_owned())),
        ),
        ("strToSlice", FilterFunc::new(str_to_slice)),
        ("strToInts", FilterFunc::new(str_to_ints)),
    ];

    for (name, func) in builtins {
        registry.insert_builtin_filter(name, func);
    }
}
