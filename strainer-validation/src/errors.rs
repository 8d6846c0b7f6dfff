// Validation errors

use crate::value::Kind;
use once_cell::sync::Lazy;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::BuildHasher;
use thiserror::Error;

/// Hard errors: bad input to a constructor, failed writes and
/// misconfiguration.
///
/// Data-dependent failures never show up here; they are collected in
/// [`ValidationErrors`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data source: {0}")]
    InvalidDataSource(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field not settable: {0}")]
    FieldNotSettable(String),

    #[error("Field '{field}' cannot store a {kind} value")]
    UnsupportedValue { field: String, kind: Kind },

    #[error("Argument type mismatch: '{func}' parameter #{index} expects {expected}, got {actual}")]
    ArgumentTypeMismatch {
        func: String,
        index: usize,
        expected: Kind,
        actual: Kind,
    },

    #[error("Filter '{filter}' failed: {message}")]
    FilterExecution { filter: String, message: String },

    #[error("Cannot bind '{field}': {reason}")]
    BindMismatch { field: String, reason: String },

    #[error("Invalid function '{name}': {reason}")]
    InvalidFunction { name: String, reason: String },

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Form error: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
}

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error for a single field
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Field name that failed validation
    pub field: String,

    /// Error message
    pub message: String,

    /// Validation constraint that failed (canonical validator name or `_filter`)
    pub constraint: String,

    /// Value that failed validation (optional)
    pub value: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            constraint: "custom".to_string(),
            value: None,
        }
    }

    /// Set the constraint name
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }

    /// Set the invalid value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

// Fixed for the life of the process so `random()` picks the same error
// for the same error set within one run.
static PICK_SEED: Lazy<RandomState> = Lazy::new(RandomState::new);

/// Collection of validation errors.
///
/// Behaves like `field -> constraint -> message`: adding a second error for
/// the same `(field, constraint)` replaces the first. Insertion order is
/// kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add an error, replacing any earlier one with the same field and constraint
    pub fn add(&mut self, error: ValidationError) {
        match self
            .errors
            .iter_mut()
            .find(|e| e.field == error.field && e.constraint == error.constraint)
        {
            Some(existing) => *existing = error,
            None => self.errors.push(error),
        }
    }

    /// Add an error from its parts
    pub fn add_message(
        &mut self,
        field: impl Into<String>,
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.add(ValidationError::new(field, message).with_constraint(constraint));
    }

    /// Remove every error
    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// First error message, or an empty string when there are none
    pub fn one(&self) -> &str {
        self.errors.first().map(|e| e.message.as_str()).unwrap_or("")
    }

    /// First message of a field picked from the failed fields.
    ///
    /// The pick depends only on the set of failed fields, so it is stable for
    /// the duration of the process.
    pub fn random(&self) -> &str {
        let fields = self.fields();
        if fields.is_empty() {
            return "";
        }

        let index = (PICK_SEED.hash_one(&fields) as usize) % fields.len();
        self.field_one(fields[index]).unwrap_or("")
    }

    /// Distinct failed field names in insertion order
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for error in &self.errors {
            if !fields.contains(&error.field.as_str()) {
                fields.push(&error.field);
            }
        }
        fields
    }

    /// Get errors for a specific field
    pub fn field(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    /// First message recorded for a field
    pub fn field_one(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Whether a field has at least one error
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `field -> constraint -> message`
    pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut map: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.field.clone())
                .or_default()
                .insert(error.constraint.clone(), error.message.clone());
        }
        map
    }

    /// Same shape as the `Serialize` impl: `{field: {constraint: message}}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Wrap as a hard [`Error`]
    pub fn into_error(self) -> Error {
        Error::Validation(self)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields {
            let messages: BTreeMap<&str, &str> = self
                .errors
                .iter()
                .filter(|e| e.field == field)
                .map(|e| (e.constraint.as_str(), e.message.as_str()))
                .collect();
            map.serialize_entry(field, &messages)?;
        }
        map.end()
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        let mut collected = Self::new();
        for error in errors {
            collected.add(error);
        }
        collected
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.add_message("name", "required", "name is required");
        errors.add_message("age", "min", "age min value is 1");
        errors.add_message("age", "max", "age max value is 99");
        errors
    }

    #[test]
    fn test_add_replaces_same_constraint() {
        let mut errors = sample();
        errors.add_message("name", "required", "name is missing");

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.field_one("name"), Some("name is missing"));
    }

    #[test]
    fn test_one_and_field_access() {
        let errors = sample();
        assert_eq!(errors.one(), "name is required");
        assert_eq!(errors.field("age").len(), 2);
        assert!(errors.has_field("age"));
        assert!(!errors.has_field("email"));
        assert_eq!(errors.fields(), vec!["name", "age"]);
    }

    #[test]
    fn test_random_is_stable() {
        let errors = sample();
        let picked = errors.random();
        assert!(picked == "name is required" || picked == "age min value is 1");
        assert_eq!(errors.random(), picked);
        assert_eq!(ValidationErrors::new().random(), "");
    }

    #[test]
    fn test_serialize_nested_map() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["age"]["min"], "age min value is 1");
        assert_eq!(json["name"]["required"], "name is required");
    }

    #[test]
    fn test_to_json_matches_serialize() {
        let errors = sample();
        let json = errors.to_json();

        assert_eq!(json["name"]["required"], "name is required");
        assert_eq!(json["age"]["max"], "age max value is 99");
        assert_eq!(json, serde_json::to_value(&errors).unwrap());
    }

    #[test]
    fn test_into_error() {
        let err = sample().into_error();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("name: name is required"));
    }
}
