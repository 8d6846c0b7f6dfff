// Dotted and wildcard path traversal over nested values

use crate::value::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;

/// Path segment matching every element of a collection.
pub const WILDCARD: &str = "*";

/// Path separator.
pub const SEPARATOR: char = '.';

/// Split a dotted path into segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).collect()
}

/// Whether the path contains at least one `*` segment.
pub fn has_wildcard(path: &str) -> bool {
    wildcard_count(path) > 0
}

/// Number of `*` segments in the path.
pub fn wildcard_count(path: &str) -> usize {
    path.split(SEPARATOR).filter(|seg| *seg == WILDCARD).count()
}

/// Resolve `segs` below `root`.
///
/// A `*` segment maps the rest of the path over every element of a list
/// (or every value of a map) and yields a list of the elements that
/// resolved. Any other failure to descend yields `None`.
pub fn get(root: &Value, segs: &[&str]) -> Option<Value> {
    let Some((first, rest)) = segs.split_first() else {
        return Some(root.clone());
    };

    match root.inner() {
        Value::Map(map) if *first == WILDCARD => Some(Value::List(
            map.values().filter_map(|item| get(item, rest)).collect(),
        )),
        Value::List(items) if *first == WILDCARD => Some(Value::List(
            items.iter().filter_map(|item| get(item, rest)).collect(),
        )),
        Value::Map(map) => map.get(*first).and_then(|next| get(next, rest)),
        Value::List(items) => first
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .and_then(|next| get(next, rest)),
        _ => None,
    }
}

/// Look up `path` in a map, first as a literal key, then as a dotted path.
pub fn get_in_map(map: &BTreeMap<String, Value>, path: &str) -> Option<Value> {
    if let Some(value) = map.get(path) {
        return Some(value.clone());
    }
    if !path.contains(SEPARATOR) {
        return None;
    }

    let segs = segments(path);
    let (first, rest) = segs.split_first()?;
    map.get(*first).and_then(|root| get(root, rest))
}

/// Flatten nested lists `depth` levels deep.
///
/// `[[1, 2], [3]]` flattened once is `[1, 2, 3]`. Non-list elements are
/// kept as they are.
pub fn flatten(value: Value, depth: usize) -> Value {
    if depth == 0 {
        return value;
    }

    match value.into_inner() {
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match flatten(item, depth - 1).into_inner() {
                    Value::List(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            Value::List(out)
        }
        other => other,
    }
}

/// Write `value` at `segs` below `root`.
///
/// Missing map keys are created, and null intermediates become maps. A `*`
/// segment writes into every element. Returns `false` when the path cannot
/// be written (index out of range, scalar in the way).
pub fn set(root: &mut Value, segs: &[&str], value: Value) -> bool {
    update(root, segs, &mut |_| Ok::<_, Infallible>(value.clone())).unwrap_or(false)
}

/// Replace each value matched by `segs` with `f(old)`.
///
/// The first error returned by `f` stops the walk. `Ok(false)` means
/// nothing matched.
pub fn update<F, E>(root: &mut Value, segs: &[&str], f: &mut F) -> Result<bool, E>
where
    F: FnMut(Value) -> Result<Value, E>,
{
    let Some((first, rest)) = segs.split_first() else {
        let old = std::mem::take(root);
        *root = f(old)?;
        return Ok(true);
    };

    if let Value::Ref(inner) = root {
        return update(inner, segs, f);
    }
    if root.is_null() && *first != WILDCARD {
        *root = Value::Map(Default::default());
    }

    match root {
        Value::List(items) if *first == WILDCARD => {
            let mut matched = false;
            for item in items.iter_mut() {
                matched |= update(item, rest, f)?;
            }
            Ok(matched)
        }
        Value::Map(map) if *first == WILDCARD => {
            let mut matched = false;
            for item in map.values_mut() {
                matched |= update(item, rest, f)?;
            }
            Ok(matched)
        }
        Value::Map(map) => {
            let next = map.entry(first.to_string()).or_default();
            update(next, rest, f)
        }
        Value::List(items) => match first.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(next) => update(next, rest, f),
            None => Ok(false),
        },
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        Value::from(json!({
            "user": {"name": "tom", "tags": ["a", "b"]},
            "users": [
                {"name": "john", "tags": ["x"]},
                {"name": "jane", "tags": ["y", "z"]}
            ]
        }))
    }

    #[test]
    fn test_get_nested() {
        let root = sample();
        assert_eq!(get(&root, &["user", "name"]), Some(Value::from("tom")));
        assert_eq!(get(&root, &["user", "tags", "1"]), Some(Value::from("b")));
        assert_eq!(get(&root, &["user", "tags", "9"]), None);
        assert_eq!(get(&root, &["user", "name", "x"]), None);
    }

    #[test]
    fn test_get_wildcard() {
        let root = sample();
        assert_eq!(
            get(&root, &["users", "*", "name"]),
            Some(Value::from(vec!["john", "jane"]))
        );

        let tags = get(&root, &["users", "*", "tags", "*"]).unwrap();
        assert_eq!(flatten(tags, 1), Value::from(vec!["x", "y", "z"]));
    }

    #[test]
    fn test_wildcard_count() {
        assert_eq!(wildcard_count("users.*.tags.*"), 2);
        assert!(!has_wildcard("user.name"));
    }

    #[test]
    fn test_set_creates_intermediate_maps() {
        let mut root = Value::Map(Default::default());
        assert!(set(&mut root, &["a", "b"], Value::from(1)));
        assert_eq!(get(&root, &["a", "b"]), Some(Value::from(1)));
    }

    #[test]
    fn test_set_wildcard_writes_every_branch() {
        let mut root = sample();
        assert!(set(&mut root, &["users", "*", "name"], Value::from("x")));
        assert_eq!(
            get(&root, &["users", "*", "name"]),
            Some(Value::from(vec!["x", "x"]))
        );
    }

    #[test]
    fn test_set_rejects_scalar_path() {
        let mut root = sample();
        assert!(!set(&mut root, &["user", "name", "first"], Value::from("x")));
        assert!(!set(&mut root, &["user", "tags", "5"], Value::from("x")));
    }

    #[test]
    fn test_update_maps_values() {
        let mut root = Value::from(json!({"names": [" a ", "b "]}));
        let matched = update(&mut root, &["names", "*"], &mut |v: Value| -> Result<Value, String> {
            Ok(Value::from(v.to_string().trim()))
        })
        .unwrap();

        assert!(matched);
        assert_eq!(get(&root, &["names"]), Some(Value::from(vec!["a", "b"])));
    }

    #[test]
    fn test_get_in_map_literal_key_first() {
        let mut map = BTreeMap::new();
        map.insert("a.b".to_string(), Value::from(1));
        map.insert("a".to_string(), Value::from(json!({"b": 2})));
        assert_eq!(get_in_map(&map, "a.b"), Some(Value::from(1)));
    }
}
