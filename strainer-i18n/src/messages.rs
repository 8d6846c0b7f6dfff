//! Message bundles and the per-session translator.

use crate::defaults::{BUILTIN_MESSAGES, DEFAULT_KEY};
use crate::{I18nError, Result, interpolate};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-wide message set copied into every new [`Translator`].
///
/// Changing it is configuration-time setup; sessions created earlier keep
/// their own copy.
static GLOBAL_MESSAGES: Lazy<RwLock<MessageBundle>> =
    Lazy::new(|| RwLock::new(MessageBundle::builtin()));

/// A set of message templates keyed by message ID.
///
/// IDs are either a validator name (`min`), a field-scoped validator
/// (`age.min`) or a bare field name used as that field's catch-all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBundle {
    messages: HashMap<String, String>,
}

impl MessageBundle {
    /// Create a new empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle holding the builtin English templates.
    pub fn builtin() -> Self {
        let messages = BUILTIN_MESSAGES
            .iter()
            .map(|(key, msg)| (key.to_string(), msg.to_string()))
            .collect();
        Self { messages }
    }

    /// Load from JSON.
    ///
    /// Nested objects produce dotted keys, so `{"age": {"min": "..."}}`
    /// registers `age.min`.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut bundle = Self::new();

        for (key, value) in data {
            match value {
                serde_json::Value::String(s) => {
                    bundle.messages.insert(key, s);
                }
                serde_json::Value::Object(obj) => {
                    for (sub, msg) in obj {
                        match msg {
                            serde_json::Value::String(s) => {
                                bundle.messages.insert(format!("{}.{}", key, sub), s);
                            }
                            other => {
                                return Err(I18nError::ParseError(format!(
                                    "message '{}.{}' must be a string, got {}",
                                    key, sub, other
                                )));
                            }
                        }
                    }
                }
                other => {
                    return Err(I18nError::ParseError(format!(
                        "message '{}' must be a string or object, got {}",
                        key, other
                    )));
                }
            }
        }

        Ok(bundle)
    }

    /// Add a message.
    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.messages.insert(key.into(), message.into());
    }

    /// Merge another bundle over this one.
    pub fn extend(&mut self, other: MessageBundle) {
        self.messages.extend(other.messages);
    }

    /// Get a message.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(|s| s.as_str())
    }

    /// Check if bundle has a message.
    pub fn has(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get all message keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.messages.keys()
    }
}

/// Add messages to the process-wide set.
pub fn add_global_messages<K, V>(messages: impl IntoIterator<Item = (K, V)>)
where
    K: Into<String>,
    V: Into<String>,
{
    let mut global = GLOBAL_MESSAGES.write();
    for (key, msg) in messages {
        global.add(key, msg);
    }
}

/// Snapshot of the process-wide message set.
pub fn global_messages() -> MessageBundle {
    GLOBAL_MESSAGES.read().clone()
}

/// Replace the process-wide message set, e.g. to restore a snapshot.
pub fn restore_global_messages(bundle: MessageBundle) {
    *GLOBAL_MESSAGES.write() = bundle;
}

/// Restore the process-wide message set to the builtin templates.
pub fn reset_global_messages() {
    restore_global_messages(MessageBundle::builtin());
}

/// Maps `(validator, field)` pairs to readable messages.
///
/// Each session owns one translator, seeded from the process-wide set.
#[derive(Debug, Clone)]
pub struct Translator {
    messages: MessageBundle,
    labels: HashMap<String, String>,
}

impl Translator {
    /// Create a translator from the current process-wide messages.
    pub fn new() -> Self {
        Self {
            messages: global_messages(),
            labels: HashMap::new(),
        }
    }

    /// Create a translator over an explicit bundle.
    pub fn with_bundle(messages: MessageBundle) -> Self {
        Self {
            messages,
            labels: HashMap::new(),
        }
    }

    /// Build the message for a failed validator.
    ///
    /// Lookup order: `field.validator`, `validator`, `field`, then `_`.
    /// `validator` is expected in canonical form.
    pub fn message(&self, validator: &str, field: &str, args: &[String]) -> String {
        self.message_as(validator, validator, field, args)
    }

    /// Like [`Translator::message`], also trying `written`, the validator
    /// name as a rule spelled it (an alias such as `minLen`).
    ///
    /// Lookup order: `field.validator`, `field.written`, `validator`,
    /// `written`, `field`, then `_`.
    pub fn message_as(&self, validator: &str, written: &str, field: &str, args: &[String]) -> String {
        let template = self
            .messages
            .get(&format!("{}.{}", field, validator))
            .or_else(|| {
                (written != validator)
                    .then(|| self.messages.get(&format!("{}.{}", field, written)))
                    .flatten()
            })
            .or_else(|| self.messages.get(validator))
            .or_else(|| (written != validator).then(|| self.messages.get(written)).flatten())
            .or_else(|| self.messages.get(field))
            .or_else(|| self.messages.get(DEFAULT_KEY))
            .unwrap_or("{field} did not pass validation");

        interpolate(template, self.label(field), args)
    }

    /// Fill an arbitrary template using this translator's labels.
    pub fn format(&self, template: &str, field: &str, args: &[String]) -> String {
        interpolate(template, self.label(field), args)
    }

    /// Display name of a field: its label if one is registered.
    pub fn label<'a>(&'a self, field: &'a str) -> &'a str {
        self.labels.get(field).map(|s| s.as_str()).unwrap_or(field)
    }

    /// Whether a message key exists.
    pub fn has_message(&self, key: &str) -> bool {
        self.messages.has(key)
    }

    /// Add or override one message.
    pub fn add_message(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.messages.add(key, message);
    }

    /// Add or override several messages.
    pub fn add_messages<K, V>(&mut self, messages: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, msg) in messages {
            self.messages.add(key, msg);
        }
    }

    /// Merge a JSON message document over the current messages.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        self.messages.extend(MessageBundle::from_json(json)?);
        Ok(())
    }

    /// Register a display label for a field.
    pub fn add_label(&mut self, field: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(field.into(), label.into());
    }

    /// Register several field labels.
    pub fn add_labels<K, V>(&mut self, labels: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (field, label) in labels {
            self.labels.insert(field.into(), label.into());
        }
    }

    /// Drop every added message and label, back to the builtin templates.
    ///
    /// Builds a fresh copy; the process-wide set is left alone.
    pub fn reset(&mut self) {
        self.messages = MessageBundle::builtin();
        self.labels.clear();
    }

    /// Messages currently in use.
    pub fn messages(&self) -> &MessageBundle {
        &self.messages
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_translator() -> Translator {
        let mut bundle = MessageBundle::builtin();
        bundle.add("age.min", "{field} is too young, minimum is %v");
        bundle.add("nickname", "{field} looks wrong");
        Translator::with_bundle(bundle)
    }

    #[test]
    fn test_field_scoped_message_wins() {
        let t = create_test_translator();
        let msg = t.message("min", "age", &["18".to_string()]);
        assert_eq!(msg, "age is too young, minimum is 18");
    }

    #[test]
    fn test_validator_message() {
        let t = create_test_translator();
        let msg = t.message("minLength", "name", &["6".to_string()]);
        assert_eq!(msg, "name value min length is 6");
    }

    #[test]
    fn test_message_under_written_alias() {
        let mut t = create_test_translator();
        t.add_message("minLen", "{field} needs %v characters");
        let args = ["6".to_string()];

        assert_eq!(t.message_as("minLength", "minLen", "name", &args), "name needs 6 characters");
        assert_eq!(t.message("minLength", "name", &args), "name value min length is 6");

        t.add_message("minLength", "{field} is short");
        assert_eq!(t.message_as("minLength", "minLen", "name", &args), "name is short");
    }

    #[test]
    fn test_field_catch_all() {
        let t = create_test_translator();
        assert_eq!(t.message("customCheck", "nickname", &[]), "nickname looks wrong");
    }

    #[test]
    fn test_default_template() {
        let t = create_test_translator();
        assert_eq!(t.message("customCheck", "title", &[]), "title did not pass validation");
    }

    #[test]
    fn test_label_substitution() {
        let mut t = create_test_translator();
        t.add_label("email", "E-mail address");
        assert_eq!(
            t.message("required", "email", &[]),
            "E-mail address is required and must not be empty"
        );
    }

    #[test]
    fn test_reset_restores_builtin() {
        let mut t = create_test_translator();
        t.add_message("required", "need {field}");
        t.add_label("email", "Mail");
        t.reset();

        assert!(!t.has_message("age.min"));
        assert_eq!(
            t.message("required", "email", &[]),
            "email is required and must not be empty"
        );
    }

    #[test]
    fn test_message_bundle_from_json() {
        let json = r#"{
            "required": "{field} must be filled",
            "age": {
                "min": "{field} must be at least %v"
            }
        }"#;

        let bundle = MessageBundle::from_json(json).unwrap();

        assert_eq!(bundle.get("required"), Some("{field} must be filled"));
        assert_eq!(bundle.get("age.min"), Some("{field} must be at least %v"));
    }

    #[test]
    fn test_message_bundle_rejects_numbers() {
        assert!(MessageBundle::from_json(r#"{"required": 3}"#).is_err());
    }
}
