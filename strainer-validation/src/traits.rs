// Struct integration traits

use crate::errors::Result;
use crate::validation::Validation;
use crate::value::Value;

/// Rule declaration for one struct field.
///
/// This is what a derive or hand-written impl hands the engine in place of
/// struct tags: `validate:"required|min:5" filter:"trim"` becomes
/// `FieldSpec::new("age").rules("required|min:5").filters("trim")`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpec {
    /// Field name as exposed through [`Structured::get_field`]
    pub name: String,

    /// Validation rule string, e.g. `required|min_len:3`
    pub rules: Option<String>,

    /// Filter rule string, e.g. `trim|lower`
    pub filters: Option<String>,

    /// Custom message.
    ///
    /// Either one message for the whole field, or `validator:message`
    /// pairs separated by `|`.
    pub message: Option<String>,

    /// Display name used in messages
    pub label: Option<String>,

    /// Value injected when the field is absent or empty
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn filters(mut self, filters: impl Into<String>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Expand [`FieldSpec::message`] into message keys.
    ///
    /// `"required:need it|min:too small"` gives `name.required` and
    /// `name.min`; a message without pairs is the field's catch-all.
    pub fn message_entries(&self) -> Vec<(String, String)> {
        let Some(message) = self.message.as_deref() else {
            return Vec::new();
        };

        let pairs: Vec<(&str, &str)> = message
            .split('|')
            .filter_map(|part| part.split_once(':'))
            .map(|(name, msg)| (name.trim(), msg.trim()))
            .filter(|(name, _)| is_identifier(name))
            .collect();

        if pairs.is_empty() || pairs.len() != message.split('|').count() {
            return vec![(self.name.clone(), message.to_string())];
        }

        pairs
            .into_iter()
            .map(|(validator, msg)| (format!("{}.{}", self.name, validator), msg.to_string()))
            .collect()
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A struct whose fields can be read, written and validated by name.
///
/// ```
/// use strainer_validation::{FieldSpec, Result, Structured, Value, Error};
///
/// #[derive(Default)]
/// struct User {
///     name: String,
/// }
///
/// impl Structured for User {
///     fn fields(&self) -> Vec<FieldSpec> {
///         vec![FieldSpec::new("name").rules("required|minLen:3")]
///     }
///
///     fn get_field(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(Value::from(&self.name)),
///             _ => None,
///         }
///     }
///
///     fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
///         match name {
///             "name" => {
///                 self.name = value.to::<String>().ok_or_else(|| Error::BindMismatch {
///                     field: name.to_string(),
///                     reason: "expected a string".to_string(),
///                 })?;
///                 Ok(())
///             }
///             _ => Err(Error::FieldNotFound(name.to_string())),
///         }
///     }
/// }
/// ```
pub trait Structured {
    /// Declared fields, in declaration order
    fn fields(&self) -> Vec<FieldSpec>;

    /// Current value of a field; `None` if there is no such field
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Store a value into a field
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// Extra message templates keyed like translator messages
    fn messages(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Field display labels
    fn labels(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Named scenes, each a whitelist of field names
    fn scenes(&self) -> Vec<(String, Vec<String>)> {
        Vec::new()
    }

    /// Hook run once a session has been built for this type.
    fn configure(_validation: &mut Validation<'_>)
    where
        Self: Sized,
    {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_entries_single() {
        let spec = FieldSpec::new("name").message("name is bad");
        assert_eq!(
            spec.message_entries(),
            vec![("name".to_string(), "name is bad".to_string())]
        );
    }

    #[test]
    fn test_message_entries_pairs() {
        let spec = FieldSpec::new("age").message("required:need age|min:too young");
        assert_eq!(
            spec.message_entries(),
            vec![
                ("age.required".to_string(), "need age".to_string()),
                ("age.min".to_string(), "too young".to_string()),
            ]
        );
    }

    #[test]
    fn test_message_with_colon_is_catch_all() {
        let spec = FieldSpec::new("t").message("use the HH:MM format");
        assert_eq!(spec.message_entries().len(), 1);
    }
}
