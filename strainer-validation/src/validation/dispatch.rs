// Per-field rule application and filtering

use super::Validation;
use crate::convert;
use crate::errors::{Error, ValidationError};
use crate::path;
use crate::registry::{self, FuncMeta, ValidatorFunc};
use crate::rules::{FilterRule, Rule};
use crate::source::DataKind;
use crate::validators;
use crate::value::Value;
use strainer_i18n::FILTER_KEY;

/// A rule's validator, resolved for one application.
struct Resolved {
    func: Option<ValidatorFunc>,
    meta: FuncMeta,
    args: Vec<Value>,
}

impl Validation<'_> {
    pub(super) fn apply_rule(&mut self, rule: &Rule) {
        for field in &rule.fields {
            if self.stopped {
                return;
            }
            self.apply_rule_to(rule, field);
        }
    }

    fn apply_rule_to(&mut self, rule: &Rule, field: &str) {
        let name = rule.name.as_str();

        if !rule.scene.is_empty() && !rule.scene.contains(&self.scene) {
            tracing::trace!(field, validator = name, "rule not active in scene");
            return;
        }
        if !self.scene_allows(field) {
            tracing::trace!(field, scene = %self.scene, "field not in scene");
            return;
        }
        if let Some(before) = &rule.before
            && !before(field, &*self)
        {
            tracing::trace!(field, validator = name, "skipped by before hook");
            return;
        }

        let resolved = self.resolve(rule);
        let skip_empty = rule.skip_empty.unwrap_or(self.options.skip_on_empty);

        if validators::is_file_validator(name) {
            let absent = self.data.files().is_none_or(|files| !files.contains_key(field));
            if absent && skip_empty && self.data.kind() == DataKind::Form {
                tracing::trace!(field, validator = name, "no upload, skipped");
                return;
            }
            let passed = validators::fast_path(self, name, field, &Value::Null, &resolved.args)
                .unwrap_or(false);
            if !passed {
                self.record_failure(rule, field, &Value::Null, &resolved.meta);
            }
            return;
        }

        if self.defaulted.contains_key(field) && !self.options.check_default {
            return;
        }

        let mut value = match self.defaulted.get(field) {
            Some(default) => Some(default.clone()),
            None => self.get(field),
        };
        let found = value.is_some();
        let empty = value.as_ref().is_none_or(Value::is_empty);

        let default = rule
            .default_value
            .as_ref()
            .or_else(|| self.defaults.get(field))
            .cloned();
        let inject = empty && !self.defaulted.contains_key(field);
        if let Some(default) = default.filter(|_| inject) {
            self.store_default(field, default.clone());
            self.defaulted.insert(field.to_string(), default.clone());
            tracing::trace!(field, value = %default, "default value injected");

            if !self.options.check_default {
                self.safe_data.insert(field.to_string(), default);
                return;
            }
            value = Some(default);
        } else if rule.optional && empty {
            tracing::trace!(field, validator = name, "optional and empty, skipped");
            return;
        }

        if let Some(filter) = &rule.filter
            && let Some(raw) = value.take()
        {
            match filter(raw) {
                Ok(filtered) => {
                    self.write_back(field, filtered.clone());
                    value = Some(filtered);
                }
                Err(message) => {
                    self.record_filter_error(field, &message);
                    return;
                }
            }
        }

        let value = value.unwrap_or_default();
        if skip_empty && value.is_empty() && !validators::is_required_family(name) {
            tracing::trace!(field, validator = name, "empty value, skipped");
            return;
        }

        let (passed, checked) = self.check_value(name, field, &value, &resolved);
        if passed {
            if found || self.defaulted.contains_key(field) {
                self.safe_data.insert(field.to_string(), checked);
            }
        } else {
            self.record_failure(rule, field, &value, &resolved.meta);
        }
    }

    fn resolve(&self, rule: &Rule) -> Resolved {
        let func = rule
            .check
            .clone()
            .or_else(|| self.registry.validator(&rule.validator).cloned())
            .or_else(|| registry::validator(&rule.validator));

        let meta = match &func {
            Some(func) => func.meta().clone(),
            None => validators::fast_path_meta(&rule.name).unwrap_or_else(|| {
                panic!(
                    "{}",
                    Error::InvalidRule(format!("unknown validator '{}'", rule.validator))
                )
            }),
        };

        let args = rule
            .arguments
            .iter()
            .enumerate()
            .map(|(i, arg)| coerce_arg(&rule.name, &meta, i + 1, arg))
            .collect();

        Resolved { func, meta, args }
    }

    /// Check a value, element by element for wildcard paths.
    ///
    /// Also returns the value as the validator saw it.
    fn check_value(&self, name: &str, field: &str, value: &Value, resolved: &Resolved) -> (bool, Value) {
        if path::has_wildcard(field)
            && let Some(items) = value.as_list()
        {
            if items.is_empty() && validators::is_required_family(name) {
                return (self.check_one(name, field, value, resolved).0, value.clone());
            }

            let mut checked = Vec::with_capacity(items.len());
            for item in items {
                let (passed, item) = self.check_one(name, field, item, resolved);
                if !passed {
                    return (false, value.clone());
                }
                checked.push(item);
            }
            return (true, Value::List(checked));
        }

        self.check_one(name, field, value, resolved)
    }

    fn check_one(&self, name: &str, field: &str, value: &Value, resolved: &Resolved) -> (bool, Value) {
        if name == "required" && resolved.func.is_none() {
            return (validators::required(value), value.clone());
        }
        self.call(name, field, value, resolved)
    }

    fn call(&self, name: &str, field: &str, value: &Value, resolved: &Resolved) -> (bool, Value) {
        let Some(value) = convert::to_kind(value, resolved.meta.kind_at(0)) else {
            tracing::trace!(field, validator = name, kind = %value.kind(), "value does not convert");
            return (false, value.clone());
        };

        let passed = match &resolved.func {
            Some(func) => {
                let mut args = Vec::with_capacity(resolved.args.len() + 1);
                args.push(value.clone());
                args.extend_from_slice(&resolved.args);
                func.call_coerced(&args)
            }
            None => validators::fast_path(self, name, field, &value, &resolved.args),
        };

        (passed.unwrap_or(false), value)
    }

    fn record_failure(&mut self, rule: &Rule, field: &str, value: &Value, meta: &FuncMeta) {
        let args = message_args(&rule.arguments, meta);
        let message = match rule.custom_message(field) {
            Some(template) => self.translator.format(template, field, &args),
            None => self.translator.message_as(&rule.name, &rule.validator, field, &args),
        };

        let mut error = ValidationError::new(field, message).with_constraint(rule.name.clone());
        if !value.is_null() {
            error = error.with_value(value.to_string());
        }
        tracing::trace!(field, validator = %rule.name, "check failed");

        self.errors.add(error);
        if self.options.stop_on_error {
            self.stopped = true;
        }
    }

    fn record_filter_error(&mut self, field: &str, reason: &str) {
        let prefix = self.translator.message(FILTER_KEY, field, &[]);
        self.errors.add(
            ValidationError::new(field, format!("{}: {}", prefix, reason)).with_constraint(FILTER_KEY),
        );
        if self.options.stop_on_error {
            self.stopped = true;
        }
    }

    /// Store a changed value in the source, or only in the filtered data
    /// when the source refuses it.
    fn write_back(&mut self, field: &str, value: Value) {
        if let Err(err) = self.data.set(field, value.clone()) {
            tracing::warn!(field, error = %err, "value not written back to the data source");
        }
        self.filtered_data.insert(field.to_string(), value);
    }

    /// Store an injected default in the source only; filtered data holds
    /// filter output.
    fn store_default(&mut self, field: &str, value: Value) {
        if let Err(err) = self.data.set(field, value) {
            tracing::warn!(field, error = %err, "default not written back to the data source");
        }
    }

    pub(super) fn apply_filter_rule(&mut self, rule: &FilterRule) {
        for field in &rule.fields {
            if self.stopped {
                return;
            }
            if !self.scene_allows(field) {
                continue;
            }
            let Some(value) = self.data.get(field) else {
                continue;
            };

            if !path::has_wildcard(field) {
                match self.pipe_filters(rule, field, value) {
                    Ok(filtered) => self.write_back(field, filtered),
                    Err(reason) => self.record_filter_error(field, &reason),
                }
                continue;
            }

            let segs = path::segments(field);
            let Some((root, rest)) = segs.split_first() else {
                continue;
            };
            let Some(mut root_value) = self.data.get(root) else {
                continue;
            };

            let updated =
                path::update(&mut root_value, rest, &mut |item| self.pipe_filters(rule, field, item));
            match updated {
                Ok(_) => self.write_back(root, root_value),
                Err(reason) => self.record_filter_error(field, &reason),
            }
        }
    }

    /// Pipe a value through the rule's filter chain.
    fn pipe_filters(&self, rule: &FilterRule, field: &str, value: Value) -> Result<Value, String> {
        let mut value = value;

        for (name, args) in &rule.filters {
            let Some(func) = self
                .registry
                .filter(name)
                .cloned()
                .or_else(|| registry::filter(name))
            else {
                panic!("{}", Error::InvalidRule(format!("unknown filter '{}'", name)));
            };
            let meta = func.meta();

            let failed = |message: String| {
                Error::FilterExecution {
                    filter: name.clone(),
                    message,
                }
                .to_string()
            };

            let mut call_args = Vec::with_capacity(args.len() + 1);
            match convert::to_kind(&value, meta.kind_at(0)) {
                Some(v) => call_args.push(v),
                None => return Err(failed(format!("cannot filter a {} value", value.kind()))),
            }
            for (i, arg) in args.iter().enumerate() {
                call_args.push(coerce_arg(name, meta, i + 1, arg));
            }

            value = match func.call_coerced(&call_args) {
                Some(result) => result.map_err(failed)?,
                None => return Err(failed("argument extraction failed".to_string())),
            };
            tracing::trace!(field, filter = %name, "filter applied");
        }

        Ok(value)
    }
}

/// Coerce rule argument `index` (the value is index 0) to its declared
/// kind.
///
/// # Panics
///
/// Panics with [`Error::ArgumentTypeMismatch`]: the rule is misconfigured.
fn coerce_arg(func: &str, meta: &FuncMeta, index: usize, arg: &Value) -> Value {
    let expected = meta.kind_at(index);
    convert::to_kind(arg, expected).unwrap_or_else(|| {
        panic!(
            "{}",
            Error::ArgumentTypeMismatch {
                func: func.to_string(),
                index,
                expected,
                actual: arg.kind(),
            }
        )
    })
}

/// Display strings for message placeholders.
///
/// A variadic tail of several arguments fills a single `%v` as `[a, b]`.
fn message_args(args: &[Value], meta: &FuncMeta) -> Vec<String> {
    let fixed = meta.num_params.saturating_sub(2);
    if !meta.variadic || args.len() <= fixed + 1 {
        return args.iter().map(Value::to_string).collect();
    }

    let mut out: Vec<String> = args[..fixed].iter().map(Value::to_string).collect();
    out.push(Value::List(args[fixed..].to_vec()).to_string());
    out
}
