// Engine-wide configuration

use crate::convert::parse_bool;
use crate::errors::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;
use std::env;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "STRAINER";

static GLOBAL_OPTIONS: Lazy<RwLock<Options>> = Lazy::new(|| RwLock::new(Options::default()));

/// Defaults copied into every new session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Halt at the first recorded error
    pub stop_on_error: bool,

    /// Skip non-`required*` validators when the value is empty
    pub skip_on_empty: bool,

    /// Validate injected default values instead of trusting them
    pub check_default: bool,

    /// Maximum flattening depth for multi-wildcard paths (unlimited if unset)
    pub wildcard_depth: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            stop_on_error: true,
            skip_on_empty: true,
            check_default: false,
            wildcard_depth: None,
        }
    }
}

impl Options {
    /// Defaults overlaid with `STRAINER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with variables from `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut opts = Self::default();
        let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));
        let flag = |name: &str, raw: String| {
            parse_bool(&raw)
                .filter(|_| !raw.trim().is_empty())
                .ok_or_else(|| {
                    Error::Config(format!("{}_{}: '{}' is not a boolean", ENV_PREFIX, name, raw))
                })
        };

        if let Some(raw) = var("STOP_ON_ERROR") {
            opts.stop_on_error = flag("STOP_ON_ERROR", raw)?;
        }
        if let Some(raw) = var("SKIP_ON_EMPTY") {
            opts.skip_on_empty = flag("SKIP_ON_EMPTY", raw)?;
        }
        if let Some(raw) = var("CHECK_DEFAULT") {
            opts.check_default = flag("CHECK_DEFAULT", raw)?;
        }
        if let Some(raw) = var("WILDCARD_DEPTH") {
            let depth = raw.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!("{}_WILDCARD_DEPTH: {}", ENV_PREFIX, e))
            })?;
            opts.wildcard_depth = Some(depth);
        }

        Ok(opts)
    }

    /// Load from a JSON document; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Current process-wide options
pub fn options() -> Options {
    GLOBAL_OPTIONS.read().clone()
}

/// Change the process-wide options. Existing sessions are not affected.
pub fn configure(f: impl FnOnce(&mut Options)) {
    f(&mut *GLOBAL_OPTIONS.write());
}

/// Restore the process-wide options to their defaults
pub fn reset_options() {
    *GLOBAL_OPTIONS.write() = Options::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert!(opts.stop_on_error);
        assert!(opts.skip_on_empty);
        assert!(!opts.check_default);
        assert_eq!(opts.wildcard_depth, None);
    }

    #[test]
    fn test_from_lookup() {
        let opts = Options::from_lookup(lookup(&[
            ("STRAINER_STOP_ON_ERROR", "0"),
            ("STRAINER_CHECK_DEFAULT", "true"),
            ("STRAINER_WILDCARD_DEPTH", "2"),
        ]))
        .unwrap();

        assert!(!opts.stop_on_error);
        assert!(opts.skip_on_empty);
        assert!(opts.check_default);
        assert_eq!(opts.wildcard_depth, Some(2));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = Options::from_lookup(lookup(&[("STRAINER_SKIP_ON_EMPTY", "maybe")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_json_partial() {
        let opts = Options::from_json(r#"{"stop_on_error": false}"#).unwrap();
        assert!(!opts.stop_on_error);
        assert!(opts.skip_on_empty);
    }
}
