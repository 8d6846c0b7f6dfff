//! Rule-driven data filtering and validation.
//!
//! A [`Validation`] session wraps a data source (a struct, a map, a form,
//! a JSON body or an HTTP request), runs filter chains over it and then
//! checks each field against its rules, collecting readable errors.
//!
//! # Examples
//!
//! ## Map data
//!
//! ```
//! use strainer_validation::{Validation, Value};
//!
//! let mut v = Validation::map([("age", Value::from(45)), ("email", Value::from("a@b.io"))]);
//! v.string_rule("age", "required|int|min:1|max:99");
//! v.string_rule("email", "required|email");
//!
//! assert!(v.validate());
//! assert_eq!(v.safe_val("age"), Some(&Value::from(45)));
//! ```
//!
//! ## Forms, filters and scenes
//!
//! ```
//! use strainer_validation::{Validation, Value};
//!
//! let mut v = Validation::form_str("name=%20Tom%20&code=x").unwrap();
//! v.filter_rule("name", "trim|lower");
//! v.string_rule("name", "required|minLen:2");
//! v.string_rule("code", "required|minLen:4");
//! v.with_scenes([("signup", vec!["name"])]);
//!
//! assert!(v.validate_at("signup"));
//! assert_eq!(v.safe_val("name"), Some(&Value::from("tom")));
//! assert!(v.safe_val("code").is_none());
//! ```
//!
//! ## Custom functions
//!
//! ```
//! use strainer_validation::{Validation, Value};
//!
//! let mut v = Validation::map([("n", Value::from("12"))]);
//! v.add_validator("multipleOf", |n: i64, m: i64| m != 0 && n % m == 0).unwrap();
//! v.string_rule("n", "multipleOf:5");
//! v.add_messages([("multipleOf", "{field} must be a multiple of %v")]);
//!
//! assert!(!v.validate());
//! assert_eq!(v.errors().one(), "n must be a multiple of 5");
//! ```

pub mod convert;
mod errors;
mod filters;
mod options;
pub mod path;
pub mod registry;
mod request;
mod rules;
pub mod source;
mod traits;
mod validation;
mod validators;
mod value;

pub use errors::*;
pub use options::{ENV_PREFIX, Options, configure, options, reset_options};
pub use registry::{
    FilterFunc, FilterOutput, FuncMeta, IntoFilter, IntoValidator, Registry, ValidatorFunc,
    add_filter, add_validator, filter_name, has_filter, has_validator, validator_name,
};
pub use request::{FormFile, MultipartParser, from_request};
pub use rules::{FilterRule, Rule};
pub use source::{DataKind, DataSource, FormData, MapData, StructData};
pub use traits::{FieldSpec, Structured};
pub use validation::Validation;
pub use validators::{fast_path_meta, is_file_validator, is_required_family, matches_pattern, required};
pub use value::{Kind, Param, Value, Variadic};

pub mod prelude {
    pub use crate::{
        Error, FieldSpec, FilterRule, FormData, MapData, Result, Rule, Structured, Validation,
        ValidationError, ValidationErrors, Value, Variadic,
    };
}
