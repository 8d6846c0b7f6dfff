//! Message translation for Strainer validation errors
//!
//! Turns a failed `(validator, field)` pair into readable text:
//!
//! - **Message Bundles**: templates keyed by validator, `field.validator` or field
//! - **Field Labels**: display names substituted for `{field}`
//! - **Interpolation**: positional `%v` / `%d` / `%s` arguments
//! - **Process-wide Defaults**: a shared message set seeded into each translator
//!
//! # Quick Start
//!
//! ```rust
//! use strainer_i18n::Translator;
//!
//! let mut translator = Translator::new();
//! translator.add_label("name", "User name");
//! translator.add_message("name.minLength", "{field} needs at least %v characters");
//!
//! let msg = translator.message("minLength", "name", &["6".to_string()]);
//! assert_eq!(msg, "User name needs at least 6 characters");
//! ```

mod defaults;
mod error;
mod format;
mod messages;

pub use defaults::{DEFAULT_KEY, FILTER_KEY};
pub use error::I18nError;
pub use format::{FIELD_PLACEHOLDER, interpolate};
pub use messages::{
    MessageBundle, Translator, add_global_messages, global_messages, reset_global_messages,
    restore_global_messages,
};

/// Result type for i18n operations
pub type Result<T> = std::result::Result<T, I18nError>;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{I18nError, MessageBundle, Result, Translator, interpolate};
}
