// Strainer - rule-driven filtering and validation for Rust
//
// This library wraps structs, maps, forms and HTTP requests in a validation
// session, runs filter chains over them and reports translatable errors.

// Re-export the engine
pub use strainer_validation::*;

// Re-export message translation
pub use strainer_i18n;
pub use strainer_i18n::{MessageBundle, Translator};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Error, FieldSpec, FilterRule, FormData, MapData, Result, Rule, Structured, Translator,
        Validation, ValidationError, ValidationErrors, Value, Variadic,
    };
}
