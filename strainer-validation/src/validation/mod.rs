//! The validation session.
//!
//! A [`Validation`] owns a data source, the rules and filter rules declared
//! against it, and the results of the last run. A run filters first, then
//! validates:
//!
//! ```
//! use strainer_validation::{Validation, Value};
//!
//! let mut v = Validation::map([("age", Value::from("50 ")), ("name", Value::from("ab"))]);
//! v.filter_rule("age", "int");
//! v.string_rule("age", "required|min:1");
//! v.string_rule("name", "required|minLen:6");
//!
//! assert!(!v.validate());
//! assert_eq!(v.errors().one(), "name value min length is 6");
//! assert_eq!(v.filtered("age"), Some(&Value::Int(50)));
//! ```
//!
//! Sessions are single-threaded and meant to be used once per input; they
//! can be reset and reused.

mod dispatch;

use crate::errors::{Error, Result, ValidationErrors};
use crate::options::{self, Options};
use crate::path;
use crate::registry::{self, FuncMeta, IntoFilter, IntoValidator, Registry, validator_name};
use crate::request::{self, FormFile};
use crate::rules::{self, DEFAULT_RULE, FilterRule, Rule};
use crate::source::{DataKind, DataSource, FormData, MapData, StructData};
use crate::traits::Structured;
use crate::validators;
use crate::value::Value;
use http::Request;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::mem;
use strainer_i18n::Translator;

/// A validation session over one data source.
pub struct Validation<'a> {
    data: Box<dyn DataSource + 'a>,
    rules: Vec<Rule>,
    filter_rules: Vec<FilterRule>,
    scenes: HashMap<String, Vec<String>>,
    scene: String,
    defaults: HashMap<String, Value>,
    errors: ValidationErrors,
    safe_data: BTreeMap<String, Value>,
    filtered_data: BTreeMap<String, Value>,
    defaulted: HashMap<String, Value>,
    validated: bool,
    validated_scene: Option<String>,
    sanitized: bool,
    stopped: bool,
    options: Options,
    translator: Translator,
    registry: Registry,
}

impl<'a> Validation<'a> {
    /// Session over any data source, using the process-wide options and
    /// messages.
    pub fn new(data: impl DataSource + 'a) -> Self {
        Self::with_source(Box::new(data))
    }

    fn with_source(data: Box<dyn DataSource + 'a>) -> Self {
        Self {
            data,
            rules: Vec::new(),
            filter_rules: Vec::new(),
            scenes: HashMap::new(),
            scene: String::new(),
            defaults: HashMap::new(),
            errors: ValidationErrors::new(),
            safe_data: BTreeMap::new(),
            filtered_data: BTreeMap::new(),
            defaulted: HashMap::new(),
            validated: false,
            validated_scene: None,
            sanitized: false,
            stopped: false,
            options: options::options(),
            translator: Translator::new(),
            registry: Registry::new(),
        }
    }

    /// Session over key/value pairs.
    pub fn map<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::new(data.into_iter().collect::<MapData>())
    }

    /// Session over URL-encoded form values.
    pub fn form(form: FormData) -> Self {
        Self::new(form)
    }

    /// Session over a raw URL-encoded string.
    pub fn form_str(input: &str) -> Result<Self> {
        Ok(Self::new(FormData::parse(input)?))
    }

    /// Session over a JSON object body.
    pub fn json(body: &[u8]) -> Result<Self> {
        Ok(Self::new(MapData::from_json(body)?))
    }

    /// Session over a struct, with the rules, filters, messages, labels,
    /// defaults and scenes it declares.
    ///
    /// Filtered and default values are written back into the struct.
    pub fn structure<T: Structured>(target: &'a mut T) -> Self {
        let specs = target.fields();
        let messages = target.messages();
        let labels = target.labels();
        let scenes = target.scenes();

        let mut v = Self::new(StructData::new(target));
        v.add_messages(messages);
        v.with_labels(labels);
        v.with_scenes(scenes);
        v.apply_specs(specs);
        T::configure(&mut v);
        v
    }

    /// Session over a struct that cannot be written to.
    ///
    /// Filters still run, but their results only reach
    /// [`Validation::filtered_data`].
    pub fn structure_ref<T: Structured>(target: &'a T) -> Self {
        let specs = target.fields();
        let messages = target.messages();
        let labels = target.labels();
        let scenes = target.scenes();

        let mut v = Self::new(StructData::read_only(target));
        v.add_messages(messages);
        v.with_labels(labels);
        v.with_scenes(scenes);
        v.apply_specs(specs);
        v
    }

    fn apply_specs(&mut self, specs: Vec<crate::traits::FieldSpec>) {
        for spec in specs {
            if let Some(label) = &spec.label {
                self.translator.add_label(&spec.name, label);
            }
            if let Some(default) = &spec.default {
                self.set_default(&spec.name, default.clone());
            }
            if let Some(filters) = &spec.filters {
                self.filter_rule(&spec.name, filters);
            }

            let first_rule = self.rules.len();
            if let Some(rules) = &spec.rules {
                self.string_rule(&spec.name, rules);
            }

            for (key, message) in spec.message_entries() {
                if key == spec.name {
                    for rule in &mut self.rules[first_rule..] {
                        rule.messages.insert(rule.name.clone(), message.clone());
                    }
                } else {
                    self.translator
                        .add_message(rules::canonical_message_key(&key), message);
                }
            }
        }
    }

    // Rules

    /// Add rules from a compact string, e.g. `required|min:1|max:99`.
    ///
    /// `default:value` sets the field's default instead of adding a rule.
    ///
    /// # Panics
    ///
    /// Panics with [`Error::InvalidRule`] on a malformed string, an unknown
    /// validator or a wrong argument count.
    pub fn string_rule(&mut self, fields: &str, rule: &str) -> &mut Self {
        for (name, args) in rules::parse_validators(rule) {
            if name == DEFAULT_RULE {
                let value = args.into_iter().next().unwrap_or_default();
                for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                    self.set_default(field, value.clone());
                }
                continue;
            }
            self.add_rule(fields, &name, args);
        }
        self
    }

    /// Add string rules for several fields.
    pub fn string_rules<K, R>(&mut self, rules: impl IntoIterator<Item = (K, R)>) -> &mut Self
    where
        K: AsRef<str>,
        R: AsRef<str>,
    {
        for (fields, rule) in rules {
            self.string_rule(fields.as_ref(), rule.as_ref());
        }
        self
    }

    /// Add one validator rule and return it for further configuration.
    ///
    /// # Panics
    ///
    /// Panics with [`Error::InvalidRule`] when the validator is unknown or
    /// does not take `args.len()` arguments.
    pub fn add_rule(&mut self, fields: &str, validator: &str, args: Vec<Value>) -> &mut Rule {
        self.append_rule(Rule::new(fields, validator, args))
    }

    /// Add a pre-built rule.
    ///
    /// # Panics
    ///
    /// Panics like [`Validation::add_rule`]; a rule with its own check
    /// function may use any name.
    pub fn append_rule(&mut self, rule: Rule) -> &mut Rule {
        let meta = match &rule.check {
            Some(func) => Some(func.meta().clone()),
            None => self.validator_meta(&rule.validator),
        };
        let Some(meta) = meta else {
            panic!(
                "{}",
                Error::InvalidRule(format!("unknown validator '{}'", rule.validator))
            );
        };
        check_arity(&rule.validator, &meta, rule.arguments.len());

        let index = self.rules.len();
        self.rules.push(rule);
        &mut self.rules[index]
    }

    /// Add a filter chain, e.g. `trim|lower`.
    ///
    /// # Panics
    ///
    /// Panics with [`Error::InvalidRule`] on an unknown filter or a wrong
    /// argument count.
    pub fn filter_rule(&mut self, fields: &str, filters: &str) -> &mut FilterRule {
        let rule = FilterRule::new(fields, filters);
        for (name, args) in &rule.filters {
            let meta = self
                .registry
                .filter(name)
                .map(|f| f.meta().clone())
                .or_else(|| registry::filter(name).map(|f| f.meta().clone()));
            let Some(meta) = meta else {
                panic!("{}", Error::InvalidRule(format!("unknown filter '{}'", name)));
            };
            check_arity(name, &meta, args.len());
        }

        let index = self.filter_rules.len();
        self.filter_rules.push(rule);
        &mut self.filter_rules[index]
    }

    /// Add filter chains for several fields.
    pub fn filter_rules<K, R>(&mut self, rules: impl IntoIterator<Item = (K, R)>) -> &mut Self
    where
        K: AsRef<str>,
        R: AsRef<str>,
    {
        for (fields, filters) in rules {
            self.filter_rule(fields.as_ref(), filters.as_ref());
        }
        self
    }

    /// Value used for `field` when it is absent or empty.
    pub fn set_default(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.defaults.insert(field.to_string(), value.into());
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn validator_meta(&self, name: &str) -> Option<FuncMeta> {
        self.registry
            .validator(name)
            .map(|f| f.meta().clone())
            .or_else(|| registry::validator(name).map(|f| f.meta().clone()))
            .or_else(|| validators::fast_path_meta(&validator_name(name)))
    }

    // Scenes

    /// Declare named scenes, each a whitelist of fields.
    pub fn with_scenes<K, F>(&mut self, scenes: impl IntoIterator<Item = (K, F)>) -> &mut Self
    where
        K: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        for (name, fields) in scenes {
            self.scenes
                .insert(name.into(), fields.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Select the scene for the next run.
    pub fn set_scene(&mut self, scene: &str) -> &mut Self {
        if self.scene != scene {
            tracing::debug!(scene, "scene selected");
            self.scene = scene.to_string();
        }
        self
    }

    /// Active scene; empty when none is set.
    pub fn scene(&self) -> &str {
        &self.scene
    }

    fn scene_allows(&self, field: &str) -> bool {
        if self.scene.is_empty() {
            return true;
        }
        match self.scenes.get(&self.scene) {
            Some(fields) => fields.iter().any(|f| {
                f == field
                    || field
                        .strip_prefix(f.as_str())
                        .is_some_and(|rest| rest.starts_with(path::SEPARATOR))
            }),
            None => true,
        }
    }

    // Messages

    /// Add or override message templates for this session.
    ///
    /// Keys are validator names (`required`), field catch-alls (`name`) or
    /// `field.validator` pairs. A bare alias key (`minLen`) applies to rules
    /// written with that alias.
    pub fn add_messages<K, V>(&mut self, messages: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, message) in messages {
            self.translator
                .add_message(rules::canonical_message_key(&key.into()), message);
        }
        self
    }

    /// Display names used in place of field names in messages.
    pub fn with_labels<K, V>(&mut self, labels: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.translator.add_labels(labels);
        self
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn translator_mut(&mut self) -> &mut Translator {
        &mut self.translator
    }

    // Session-local functions

    /// Register a validator visible only to this session.
    pub fn add_validator<M>(&mut self, name: &str, f: impl IntoValidator<M>) -> Result<()> {
        self.registry.add_validator(name, f)
    }

    /// Register a filter visible only to this session.
    pub fn add_filter<M>(&mut self, name: &str, f: impl IntoFilter<M>) -> Result<()> {
        self.registry.add_filter(name, f)
    }

    // Options

    /// Halt at the first recorded error.
    pub fn stop_on_error(&mut self, on: bool) -> &mut Self {
        self.options.stop_on_error = on;
        self
    }

    /// Skip non-`required*` validators on empty values.
    pub fn skip_on_empty(&mut self, on: bool) -> &mut Self {
        self.options.skip_on_empty = on;
        self
    }

    /// Validate injected defaults instead of trusting them.
    pub fn check_default(&mut self, on: bool) -> &mut Self {
        self.options.check_default = on;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // Running

    /// Filter then validate, returning whether every rule passed.
    ///
    /// A second call for the same scene returns the cached result without
    /// running anything again; selecting another scene starts over.
    pub fn validate(&mut self) -> bool {
        if self.validated {
            if self.validated_scene.as_deref() == Some(self.scene.as_str()) {
                return self.errors.is_empty();
            }
            self.reset_result();
        }

        tracing::debug!(
            scene = %self.scene,
            source = %self.data.kind(),
            rules = self.rules.len(),
            filter_rules = self.filter_rules.len(),
            "validation started"
        );

        if !self.sanitized {
            self.run_filters();
        }

        if !self.stopped {
            let rules = mem::take(&mut self.rules);
            for rule in &rules {
                self.apply_rule(rule);
                if self.stopped {
                    break;
                }
            }
            self.rules = rules;
        }

        self.validated = true;
        self.validated_scene = Some(self.scene.clone());
        if !self.errors.is_empty() {
            self.safe_data.clear();
        }

        tracing::debug!(
            ok = self.errors.is_empty(),
            errors = self.errors.len(),
            "validation finished"
        );
        self.errors.is_empty()
    }

    /// Select `scene` and validate.
    pub fn validate_at(&mut self, scene: &str) -> bool {
        self.set_scene(scene);
        self.validate()
    }

    /// Run only the filter rules.
    ///
    /// A later [`Validation::validate`] does not filter again.
    pub fn sanitize(&mut self) -> bool {
        if !self.sanitized {
            self.run_filters();
        }
        self.errors.is_empty()
    }

    fn run_filters(&mut self) {
        let filter_rules = mem::take(&mut self.filter_rules);
        for rule in &filter_rules {
            self.apply_filter_rule(rule);
            if self.stopped {
                break;
            }
        }
        self.filter_rules = filter_rules;
        self.sanitized = true;
    }

    /// Clear the results of the last run, keeping rules, defaults and
    /// scenes.
    pub fn reset_result(&mut self) {
        self.errors.clear();
        self.safe_data.clear();
        self.filtered_data.clear();
        self.defaulted.clear();
        self.validated = false;
        self.validated_scene = None;
        self.sanitized = false;
        self.stopped = false;
    }

    /// Clear results, rules, filter rules and defaults.
    pub fn reset(&mut self) {
        self.reset_result();
        self.rules.clear();
        self.filter_rules.clear();
        self.defaults.clear();
    }

    // Results

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// No errors recorded (so far).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_fail(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Values that passed validation; empty after a failed run.
    pub fn safe_data(&self) -> &BTreeMap<String, Value> {
        &self.safe_data
    }

    pub fn safe_val(&self, field: &str) -> Option<&Value> {
        self.safe_data.get(field)
    }

    /// Values produced by filters, kept even after a failed run.
    pub fn filtered_data(&self) -> &BTreeMap<String, Value> {
        &self.filtered_data
    }

    pub fn filtered(&self, field: &str) -> Option<&Value> {
        self.filtered_data.get(field)
    }

    /// Current value of a field, filtered value first.
    ///
    /// Paths with several wildcards come back flattened to a single list,
    /// limited by [`Options::wildcard_depth`].
    pub fn get(&self, field: &str) -> Option<Value> {
        if let Some(value) = path::get_in_map(&self.filtered_data, field) {
            return Some(value);
        }

        let value = self.data.get(field)?;
        let wildcards = path::wildcard_count(field);
        if wildcards < 2 {
            return Some(value);
        }

        let depth = wildcards - 1;
        let depth = self.options.wildcard_depth.map_or(depth, |max| depth.min(max));
        Some(path::flatten(value, depth))
    }

    /// Value as currently held by the data source.
    pub fn raw(&self, field: &str) -> Option<Value> {
        self.data.get(field)
    }

    pub fn data_kind(&self) -> DataKind {
        self.data.kind()
    }

    /// Uploaded files, for form sources.
    pub fn files(&self) -> Option<&BTreeMap<String, FormFile>> {
        self.data.files()
    }

    // Binding

    /// Deserialize the safe data into `T`.
    pub fn bind_safe_data<T: DeserializeOwned>(&self) -> Result<T> {
        let json = serde_json::Value::from(Value::Map(self.safe_data.clone()));
        serde_json::from_value(json).map_err(|e| Error::BindMismatch {
            field: "*".to_string(),
            reason: e.to_string(),
        })
    }

    /// Copy the safe data onto a struct, matching field names exactly or
    /// ignoring case.
    pub fn bind_struct(&self, target: &mut dyn Structured) -> Result<()> {
        let mut dest = StructData::new(target);

        for (field, value) in &self.safe_data {
            if path::has_wildcard(field) {
                continue;
            }
            dest.set(field, value.clone()).map_err(|err| match err {
                Error::FieldNotFound(_) => Error::BindMismatch {
                    field: field.clone(),
                    reason: "no matching field".to_string(),
                },
                other => other,
            })?;
        }

        Ok(())
    }
}

impl Validation<'static> {
    /// Session over a decoded HTTP request.
    ///
    /// See [`request::from_request`] for how the body is chosen.
    pub fn request<B: AsRef<[u8]>>(req: &Request<B>) -> Result<Self> {
        Ok(Self::with_source(request::from_request(req)?))
    }
}

impl fmt::Debug for Validation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation")
            .field("source", &self.data.kind())
            .field("rules", &self.rules)
            .field("filter_rules", &self.filter_rules)
            .field("scene", &self.scene)
            .field("validated", &self.validated)
            .field("errors", &self.errors)
            .finish()
    }
}

fn check_arity(name: &str, meta: &FuncMeta, count: usize) {
    if !meta.accepts_args(count) {
        let expected = meta.num_params.saturating_sub(1);
        let expected = if meta.variadic {
            format!("at least {}", expected.saturating_sub(1))
        } else {
            expected.to_string()
        };
        panic!(
            "{}",
            Error::InvalidRule(format!(
                "'{}' takes {} argument(s), got {}",
                name, expected, count
            ))
        );
    }
}
