// Validation and filter rules

use crate::errors::Error;
use crate::registry::{ValidatorFunc, filter_name, validator_name};
use crate::validation::Validation;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type BeforeHook = Arc<dyn Fn(&str, &Validation<'_>) -> bool + Send + Sync>;
type FilterHook = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Validators whose argument is the rest of the rule string, `|` included.
const RAW_ARG_VALIDATORS: &[&str] = &["regexp"];

/// Filters whose argument is kept whole, commas included.
const RAW_ARG_FILTERS: &[&str] = &["strToSlice", "trim", "ltrim", "rtrim", "snakeCase"];

/// Rule-string key carrying a default value rather than a validator.
pub(crate) const DEFAULT_RULE: &str = "default";

/// One validator bound to one or more fields.
///
/// Rules are usually created through [`Validation::add_rule`] or
/// [`Validation::string_rule`] and tuned with the builder methods:
///
/// ```
/// use strainer_validation::{Validation, Value};
///
/// let mut v = Validation::map([("age", Value::from(7))]);
/// v.add_rule("age", "min", vec![Value::from(18)])
///     .message("{field} must be an adult age");
///
/// assert!(!v.validate());
/// assert_eq!(v.errors().one(), "age must be an adult age");
/// ```
#[derive(Clone)]
pub struct Rule {
    pub(crate) fields: Vec<String>,
    pub(crate) validator: String,
    pub(crate) name: String,
    pub(crate) arguments: Vec<Value>,
    pub(crate) scene: Vec<String>,
    pub(crate) optional: bool,
    pub(crate) skip_empty: Option<bool>,
    pub(crate) default_value: Option<Value>,
    pub(crate) before: Option<BeforeHook>,
    pub(crate) filter: Option<FilterHook>,
    pub(crate) check: Option<ValidatorFunc>,
    pub(crate) messages: HashMap<String, String>,
}

impl Rule {
    /// Rule for comma-separated `fields`.
    pub fn new(fields: &str, validator: &str, arguments: Vec<Value>) -> Self {
        Self {
            fields: split_fields(fields),
            validator: validator.to_string(),
            name: validator_name(validator),
            arguments,
            scene: Vec::new(),
            optional: false,
            skip_empty: None,
            default_value: None,
            before: None,
            filter: None,
            check: None,
            messages: HashMap::new(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Validator name as written
    pub fn validator(&self) -> &str {
        &self.validator
    }

    /// Canonical validator name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Restrict the rule to comma-separated scenes.
    pub fn with_scene(&mut self, scenes: &str) -> &mut Self {
        self.scene = split_fields(scenes);
        self
    }

    /// Skip the rule when the value is empty, even for `required*`.
    pub fn optional(&mut self) -> &mut Self {
        self.optional = true;
        self
    }

    /// Override the session's skip-empty policy for this rule.
    pub fn skip_empty(&mut self, skip: bool) -> &mut Self {
        self.skip_empty = Some(skip);
        self
    }

    /// Value used when the field is absent or empty.
    pub fn with_default(&mut self, value: impl Into<Value>) -> &mut Self {
        self.default_value = Some(value.into());
        self
    }

    /// Run before each field; returning `false` skips the field.
    pub fn before<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&str, &Validation<'_>) -> bool + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Transform the value before it is checked. The result is written
    /// back to the data source.
    pub fn filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Check with `func` instead of a registered validator.
    pub fn check(&mut self, func: ValidatorFunc) -> &mut Self {
        self.check = Some(func);
        self
    }

    /// Message template used when this rule fails.
    pub fn message(&mut self, message: impl Into<String>) -> &mut Self {
        self.messages.insert(self.name.clone(), message.into());
        self
    }

    /// Message templates keyed by `validator` or `field.validator`.
    pub fn messages<K, V>(&mut self, messages: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, message) in messages {
            self.messages
                .insert(canonical_message_key(&key.into()), message.into());
        }
        self
    }

    /// Custom message for a failure of `field`, most specific key first.
    pub(crate) fn custom_message(&self, field: &str) -> Option<&str> {
        self.messages
            .get(&format!("{}.{}", field, self.name))
            .or_else(|| self.messages.get(&self.name))
            .or_else(|| self.messages.get(&self.validator))
            .map(String::as_str)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("fields", &self.fields)
            .field("validator", &self.name)
            .field("arguments", &self.arguments)
            .field("scene", &self.scene)
            .field("optional", &self.optional)
            .field("skip_empty", &self.skip_empty)
            .field("default_value", &self.default_value)
            .field("before", &self.before.is_some())
            .field("filter", &self.filter.is_some())
            .field("check", &self.check.is_some())
            .finish()
    }
}

/// An ordered filter chain bound to one or more fields.
#[derive(Debug, Clone, Default)]
pub struct FilterRule {
    pub(crate) fields: Vec<String>,
    pub(crate) filters: Vec<(String, Vec<Value>)>,
}

impl FilterRule {
    /// Filter rule from a chain like `trim|lower|strToSlice:;`.
    ///
    /// # Panics
    ///
    /// Panics with [`Error::InvalidRule`] on a malformed chain.
    pub fn new(fields: &str, filters: &str) -> Self {
        Self {
            fields: split_fields(fields),
            filters: parse_filters(filters),
        }
    }

    /// Append one filter to the chain.
    pub fn add_filter(&mut self, name: &str, args: Vec<Value>) -> &mut Self {
        self.filters.push((name.to_string(), args));
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn filters(&self) -> &[(String, Vec<Value>)] {
        &self.filters
    }
}

fn split_fields(fields: &str) -> Vec<String> {
    fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_args(args: &str) -> Vec<Value> {
    args.split(',').map(|a| Value::from(a.trim())).collect()
}

fn check_name(name: &str, rule: &str) -> String {
    let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        panic!(
            "{}",
            Error::InvalidRule(format!("bad function name '{}' in '{}'", name, rule))
        );
    }
    name.to_string()
}

/// Parse `required|min:1|enum:a,b` into `(validator, args)` pairs.
///
/// `regexp` takes the rest of the string as its pattern, so it must be the
/// last validator of a rule string.
///
/// # Panics
///
/// Panics with [`Error::InvalidRule`] on a malformed rule string.
pub(crate) fn parse_validators(rule: &str) -> Vec<(String, Vec<Value>)> {
    let mut parsed = Vec::new();
    let mut rest = rule;

    while !rest.is_empty() {
        let (segment, tail) = rest.split_once('|').unwrap_or((rest, ""));

        match segment.split_once(':') {
            Some((name, _)) if RAW_ARG_VALIDATORS.contains(&validator_name(name.trim()).as_str()) => {
                let pattern = rest.split_once(':').map(|(_, p)| p).unwrap_or_default();
                parsed.push((check_name(name.trim(), rule), vec![Value::from(pattern)]));
                break;
            }
            Some((name, args)) => {
                parsed.push((check_name(name.trim(), rule), split_args(args)));
            }
            None if !segment.trim().is_empty() => {
                parsed.push((check_name(segment.trim(), rule), Vec::new()));
            }
            None => {}
        }

        rest = tail;
    }

    parsed
}

/// Parse `trim|lower|strToSlice:;` into `(filter, args)` pairs.
///
/// # Panics
///
/// Panics with [`Error::InvalidRule`] on a malformed chain.
pub(crate) fn parse_filters(chain: &str) -> Vec<(String, Vec<Value>)> {
    chain
        .split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once(':') {
            Some((name, arg)) if RAW_ARG_FILTERS.contains(&filter_name(name.trim()).as_str()) => {
                (check_name(name.trim(), chain), vec![Value::from(arg)])
            }
            Some((name, args)) => (check_name(name.trim(), chain), split_args(args)),
            None => (check_name(segment, chain), Vec::new()),
        })
        .collect()
}

/// `field.min_len` -> `field.minLength`; other keys are kept as given.
pub(crate) fn canonical_message_key(key: &str) -> String {
    match key.rsplit_once('.') {
        Some((field, validator)) => format!("{}.{}", field, validator_name(validator)),
        None => key.to_string(),
    }
}
