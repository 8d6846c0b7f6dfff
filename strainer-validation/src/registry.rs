//! Named validator and filter functions.
//!
//! Two independent tables, validators and filters, exist process-wide;
//! sessions may carry their own tables that are consulted first. Function
//! metadata ([`FuncMeta`]) is computed once when a function is wrapped, so
//! the validation path only reads it.
//!
//! Registration is configuration-time setup. The tables sit behind a lock
//! only so they can be shared between threads; changing them while other
//! threads validate is the caller's responsibility.

use crate::convert;
use crate::errors::{Error, Result};
use crate::value::{Kind, Param, Value};
use crate::{filters, validators};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static FUNC_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static GLOBAL_REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::builtin()));

/// Short and snake_case validator names mapped to canonical ones.
const VALIDATOR_ALIASES: &[(&str, &str)] = &[
    ("int", "isInt"),
    ("integer", "isInt"),
    ("uint", "isUint"),
    ("float", "isFloat"),
    ("bool", "isBool"),
    ("boolean", "isBool"),
    ("string", "isString"),
    ("number", "isNumber"),
    ("num", "isNumber"),
    ("slice", "isSlice"),
    ("array", "isSlice"),
    ("arr", "isSlice"),
    ("map", "isMap"),
    ("ints", "isInts"),
    ("intList", "isInts"),
    ("strings", "isStrings"),
    ("strList", "isStrings"),
    ("alpha", "isAlpha"),
    ("alphaNum", "isAlphaNum"),
    ("alphaDash", "isAlphaDash"),
    ("email", "isEmail"),
    ("url", "isURL"),
    ("isUrl", "isURL"),
    ("ip", "isIP"),
    ("ipv4", "isIPv4"),
    ("ipv6", "isIPv6"),
    ("uuid", "isUUID"),
    ("isUuid", "isUUID"),
    ("json", "isJSON"),
    ("isJson", "isJSON"),
    ("in", "enum"),
    ("notEnum", "notIn"),
    ("minLen", "minLength"),
    ("maxLen", "maxLength"),
    ("len", "length"),
    ("lengthEq", "length"),
    ("strLen", "stringLength"),
    ("strLength", "stringLength"),
    ("range", "between"),
    ("regex", "regexp"),
    ("eq", "isEqual"),
    ("equal", "isEqual"),
    ("ne", "notEqual"),
    ("notEq", "notEqual"),
    ("lessThan", "lt"),
    ("greaterThan", "gt"),
    ("eqFld", "eqField"),
    ("neFld", "neField"),
    ("gtFld", "gtField"),
    ("gteFld", "gteField"),
    ("ltFld", "ltField"),
    ("lteFld", "lteField"),
    ("has", "contains"),
    ("file", "isFile"),
    ("image", "isImage"),
    ("mimeTypes", "inMimeTypes"),
    ("mime", "inMimeTypes"),
];

/// Short and snake_case filter names mapped to canonical ones.
const FILTER_ALIASES: &[(&str, &str)] = &[
    ("toInt", "int"),
    ("integer", "int"),
    ("toUint", "uint"),
    ("toFloat", "float"),
    ("toBool", "bool"),
    ("trimSpace", "trim"),
    ("lowercase", "lower"),
    ("toLower", "lower"),
    ("uppercase", "upper"),
    ("toUpper", "upper"),
    ("ucfirst", "ucFirst"),
    ("upperFirst", "ucFirst"),
    ("lcfirst", "lcFirst"),
    ("lowerFirst", "lcFirst"),
    ("ucwords", "ucWord"),
    ("ucWords", "ucWord"),
    ("upperWord", "ucWord"),
    ("snake", "snakeCase"),
    ("camel", "camelCase"),
    ("str2arr", "strToSlice"),
    ("str2array", "strToSlice"),
    ("strToArray", "strToSlice"),
    ("toSlice", "strToSlice"),
    ("toArray", "strToSlice"),
    ("str2ints", "strToInts"),
    ("toInts", "strToInts"),
    ("escape", "escapeHtml"),
    ("escapeHTML", "escapeHtml"),
    ("htmlEscape", "escapeHtml"),
    ("encodeUrl", "urlEncode"),
    ("decodeUrl", "urlDecode"),
    ("toStr", "toString"),
    ("str", "toString"),
];

/// `min_len` -> `minLen`
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
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

fn canonical(name: &str, aliases: &[(&str, &str)]) -> String {
    let lookup = |n: &str| {
        aliases
            .iter()
            .find(|(alias, _)| *alias == n)
            .map(|(_, canonical)| canonical.to_string())
    };

    if let Some(found) = lookup(name) {
        return found;
    }
    if name.contains('_') {
        let camel = camel_case(name);
        return lookup(&camel).unwrap_or(camel);
    }
    name.to_string()
}

/// Canonical validator name, resolving aliases and snake_case.
///
/// ```
/// use strainer_validation::validator_name;
///
/// assert_eq!(validator_name("min_len"), "minLength");
/// assert_eq!(validator_name("in"), "enum");
/// assert_eq!(validator_name("eq_field"), "eqField");
/// ```
pub fn validator_name(name: &str) -> String {
    canonical(name, VALIDATOR_ALIASES)
}

/// Canonical filter name, resolving aliases and snake_case.
pub fn filter_name(name: &str) -> String {
    canonical(name, FILTER_ALIASES)
}

/// Metadata of a registered function, computed once at registration.
///
/// Parameter 0 is the field value; the rest are rule arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncMeta {
    pub name: String,
    pub builtin: bool,
    pub num_params: usize,
    pub variadic: bool,
    pub param_kinds: Vec<Kind>,
    pub returns_error: bool,
    misplaced_variadic: bool,
}

impl FuncMeta {
    /// Metadata for parameters given as `(kind, is_variadic)` pairs.
    pub fn from_params(params: &[(Kind, bool)], returns_error: bool) -> Self {
        let last = params.len().saturating_sub(1);
        Self {
            name: String::new(),
            builtin: false,
            num_params: params.len(),
            variadic: params.last().is_some_and(|(_, v)| *v),
            param_kinds: params.iter().map(|(kind, _)| *kind).collect(),
            returns_error,
            misplaced_variadic: params
                .iter()
                .enumerate()
                .any(|(i, (_, v))| *v && (i != last || i == 0)),
        }
    }

    /// Whether a rule may pass `count` arguments (the value not included).
    pub fn accepts_args(&self, count: usize) -> bool {
        if self.variadic {
            count + 2 >= self.num_params
        } else {
            count + 1 == self.num_params
        }
    }

    /// Declared kind of parameter `index`; the variadic tail repeats its kind.
    pub fn kind_at(&self, index: usize) -> Kind {
        self.param_kinds
            .get(index)
            .or_else(|| if self.variadic { self.param_kinds.last() } else { None })
            .copied()
            .unwrap_or(Kind::Any)
    }

    /// Coerce a full argument list (value first) to the declared kinds.
    ///
    /// Returns the index of the first argument that does not convert.
    pub fn coerce(&self, args: &[Value]) -> std::result::Result<Vec<Value>, usize> {
        args.iter()
            .enumerate()
            .map(|(i, arg)| convert::to_kind(arg, self.kind_at(i)).ok_or(i))
            .collect()
    }

    fn check(&self, name: &str) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidFunction {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if !FUNC_NAME_REGEX.is_match(name) {
            return Err(invalid("name must be alphanumeric or underscore"));
        }
        if self.misplaced_variadic {
            return Err(invalid("only a trailing rule parameter may be variadic"));
        }
        Ok(())
    }
}

type ValidatorCall = Arc<dyn Fn(&[Value]) -> Option<bool> + Send + Sync>;
type FilterCall = Arc<dyn Fn(&[Value]) -> Option<std::result::Result<Value, String>> + Send + Sync>;

/// A validator callable plus its metadata.
#[derive(Clone)]
pub struct ValidatorFunc {
    meta: FuncMeta,
    call: ValidatorCall,
}

impl ValidatorFunc {
    /// Wrap a closure taking the field value and then the rule arguments.
    pub fn new<M>(f: impl IntoValidator<M>) -> Self {
        f.into_validator()
    }

    pub fn meta(&self) -> &FuncMeta {
        &self.meta
    }

    /// Call with the value followed by the arguments, coercing each.
    ///
    /// `None` when an argument does not convert or the count is wrong.
    pub fn call(&self, args: &[Value]) -> Option<bool> {
        let coerced = self.meta.coerce(args).ok()?;
        (self.call)(&coerced)
    }

    /// Call with arguments already coerced to the declared kinds.
    pub(crate) fn call_coerced(&self, args: &[Value]) -> Option<bool> {
        (self.call)(args)
    }

    fn named(mut self, name: &str, builtin: bool) -> Self {
        self.meta.name = name.to_string();
        self.meta.builtin = builtin;
        self
    }
}

impl fmt::Debug for ValidatorFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorFunc").field("meta", &self.meta).finish()
    }
}

/// A filter callable plus its metadata.
#[derive(Clone)]
pub struct FilterFunc {
    meta: FuncMeta,
    call: FilterCall,
}

impl FilterFunc {
    /// Wrap a closure taking the value and then the filter arguments.
    pub fn new<M>(f: impl IntoFilter<M>) -> Self {
        f.into_filter()
    }

    pub fn meta(&self) -> &FuncMeta {
        &self.meta
    }

    /// Apply to `value` with `args`, coercing each.
    ///
    /// `None` when an argument does not convert; `Some(Err(..))` when the
    /// filter itself reports an error.
    pub fn call(&self, value: &Value, args: &[Value]) -> Option<std::result::Result<Value, String>> {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(value.clone());
        all.extend_from_slice(args);
        let coerced = self.meta.coerce(&all).ok()?;
        (self.call)(&coerced)
    }

    /// Call with the value and arguments already coerced.
    pub(crate) fn call_coerced(&self, args: &[Value]) -> Option<std::result::Result<Value, String>> {
        (self.call)(args)
    }

    fn named(mut self, name: &str, builtin: bool) -> Self {
        self.meta.name = name.to_string();
        self.meta.builtin = builtin;
        self
    }
}

impl fmt::Debug for FilterFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterFunc").field("meta", &self.meta).finish()
    }
}

/// Conversion of a closure into a [`ValidatorFunc`].
///
/// Implemented for `Fn(A, ...) -> bool` with up to four [`Param`]
/// parameters. `M` only keeps the impls apart.
pub trait IntoValidator<M> {
    fn into_validator(self) -> ValidatorFunc;
}

/// Conversion of a closure into a [`FilterFunc`].
///
/// Implemented for `Fn(A, ...) -> R` with up to four [`Param`] parameters,
/// where `R` is a value type or a `Result` of one.
pub trait IntoFilter<M> {
    fn into_filter(self) -> FilterFunc;
}

impl IntoValidator<()> for ValidatorFunc {
    fn into_validator(self) -> ValidatorFunc {
        self
    }
}

impl IntoFilter<()> for FilterFunc {
    fn into_filter(self) -> FilterFunc {
        self
    }
}

/// Return types a filter may produce.
pub trait FilterOutput {
    const RETURNS_ERROR: bool = false;

    fn into_result(self) -> std::result::Result<Value, String>;
}

macro_rules! impl_filter_output {
    ($($t:ty),+) => {
        $(
            impl FilterOutput for $t {
                fn into_result(self) -> std::result::Result<Value, String> {
                    Ok(Value::from(self))
                }
            }
        )+
    };
}

impl_filter_output!(
    String,
    &'static str,
    bool,
    i64,
    i32,
    u64,
    usize,
    f64,
    Vec<Value>,
    Vec<String>,
    Vec<i64>
);

impl FilterOutput for Value {
    fn into_result(self) -> std::result::Result<Value, String> {
        Ok(self)
    }
}

impl<T: FilterOutput, E: fmt::Display> FilterOutput for std::result::Result<T, E> {
    const RETURNS_ERROR: bool = true;

    fn into_result(self) -> std::result::Result<Value, String> {
        match self {
            Ok(v) => v.into_result(),
            Err(e) => Err(e.to_string()),
        }
    }
}

macro_rules! impl_into_funcs {
    ($($ty:ident $arg:ident),+) => {
        impl<F, $($ty,)+> IntoValidator<($($ty,)+)> for F
        where
            F: Fn($($ty),+) -> bool + Send + Sync + 'static,
            $($ty: Param,)+
        {
            fn into_validator(self) -> ValidatorFunc {
                let meta = FuncMeta::from_params(&[$(($ty::KIND, $ty::VARIADIC)),+], false);
                let func = self;
                let call = move |args: &[Value]| {
                    let mut slots = 0..;
                    $(let $arg = $ty::extract(args, slots.next()?)?;)+
                    Some(func($($arg),+))
                };
                ValidatorFunc {
                    meta,
                    call: Arc::new(call),
                }
            }
        }

        impl<F, R, $($ty,)+> IntoFilter<(R, $($ty,)+)> for F
        where
            F: Fn($($ty),+) -> R + Send + Sync + 'static,
            R: FilterOutput,
            $($ty: Param,)+
        {
            fn into_filter(self) -> FilterFunc {
                let meta =
                    FuncMeta::from_params(&[$(($ty::KIND, $ty::VARIADIC)),+], R::RETURNS_ERROR);
                let func = self;
                let call = move |args: &[Value]| {
                    let mut slots = 0..;
                    $(let $arg = $ty::extract(args, slots.next()?)?;)+
                    Some(func($($arg),+).into_result())
                };
                FilterFunc {
                    meta,
                    call: Arc::new(call),
                }
            }
        }
    };
}

impl_into_funcs!(A a);
impl_into_funcs!(A a, B b);
impl_into_funcs!(A a, B b, C c);
impl_into_funcs!(A a, B b, C c, D d);

/// A validator table and a filter table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    validators: HashMap<String, ValidatorFunc>,
    filters: HashMap<String, FilterFunc>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the builtin functions
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        validators::register_builtins(&mut registry);
        filters::register_builtins(&mut registry);
        registry
    }

    pub(crate) fn insert_builtin_validator(&mut self, name: &str, func: ValidatorFunc) {
        self.validators
            .insert(name.to_string(), func.named(name, true));
    }

    pub(crate) fn insert_builtin_filter(&mut self, name: &str, func: FilterFunc) {
        self.filters.insert(name.to_string(), func.named(name, true));
    }

    /// Register a validator, replacing any function of the same name.
    pub fn add_validator<M>(&mut self, name: &str, f: impl IntoValidator<M>) -> Result<()> {
        let func = f.into_validator();
        func.meta.check(name)?;

        if self.validators.contains_key(name) {
            tracing::warn!(name, "validator re-registered, replacing previous definition");
        }
        self.validators
            .insert(name.to_string(), func.named(name, false));
        Ok(())
    }

    /// Register a filter, replacing any function of the same name.
    pub fn add_filter<M>(&mut self, name: &str, f: impl IntoFilter<M>) -> Result<()> {
        let func = f.into_filter();
        func.meta.check(name)?;

        if self.filters.contains_key(name) {
            tracing::warn!(name, "filter re-registered, replacing previous definition");
        }
        self.filters.insert(name.to_string(), func.named(name, false));
        Ok(())
    }

    /// Validator by name, trying the name as given then its canonical form.
    pub fn validator(&self, name: &str) -> Option<&ValidatorFunc> {
        self.validators
            .get(name)
            .or_else(|| self.validators.get(&validator_name(name)))
    }

    /// Filter by name, trying the name as given then its canonical form.
    pub fn filter(&self, name: &str) -> Option<&FilterFunc> {
        self.filters
            .get(name)
            .or_else(|| self.filters.get(&filter_name(name)))
    }

    pub fn has_validator(&self, name: &str) -> bool {
        self.validator(name).is_some()
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filter(name).is_some()
    }

    /// Names of registered validators
    pub fn validator_names(&self) -> impl Iterator<Item = &String> {
        self.validators.keys()
    }

    /// Names of registered filters
    pub fn filter_names(&self) -> impl Iterator<Item = &String> {
        self.filters.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty() && self.filters.is_empty()
    }
}

/// Register a process-wide validator.
///
/// ```
/// use strainer_validation::{add_validator, has_validator};
///
/// add_validator("isEven", |n: i64| n % 2 == 0).unwrap();
/// assert!(has_validator("isEven"));
/// assert!(add_validator("bad name", |n: i64| n > 0).is_err());
/// ```
pub fn add_validator<M>(name: &str, f: impl IntoValidator<M>) -> Result<()> {
    GLOBAL_REGISTRY.write().add_validator(name, f)
}

/// Register a process-wide filter.
pub fn add_filter<M>(name: &str, f: impl IntoFilter<M>) -> Result<()> {
    GLOBAL_REGISTRY.write().add_filter(name, f)
}

/// Process-wide validator by name (registered functions only).
pub fn validator(name: &str) -> Option<ValidatorFunc> {
    GLOBAL_REGISTRY.read().validator(name).cloned()
}

/// Process-wide filter by name.
pub fn filter(name: &str) -> Option<FilterFunc> {
    GLOBAL_REGISTRY.read().filter(name).cloned()
}

/// Whether a validator name resolves, either to a registered function or
/// to one of the explicitly dispatched builtins.
pub fn has_validator(name: &str) -> bool {
    validators::fast_path_meta(&validator_name(name)).is_some()
        || GLOBAL_REGISTRY.read().has_validator(name)
}

pub fn has_filter(name: &str) -> bool {
    GLOBAL_REGISTRY.read().has_filter(name)
}

/// Copy of the process-wide registry, e.g. to restore after a test.
pub fn snapshot() -> Registry {
    GLOBAL_REGISTRY.read().clone()
}

/// Replace the process-wide registry.
pub fn restore(registry: Registry) {
    *GLOBAL_REGISTRY.write() = registry;
}

/// Drop every user registration, keeping the builtins.
pub fn reset() {
    restore(Registry::builtin());
}
