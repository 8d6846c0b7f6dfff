//! Data sources: the uniform read/write view a session validates.

mod form;
mod map;
mod structs;

pub use form::FormData;
pub use map::MapData;
pub use structs::StructData;

use crate::errors::Result;
use crate::request::FormFile;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of the underlying data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Struct,
    Map,
    Form,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Struct => "struct",
            DataKind::Map => "map",
            DataKind::Form => "form",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability interface over the data being validated.
///
/// Paths are field names, optionally dotted (`user.name`) and wildcarded
/// (`users.*.name`). A successful `set` is visible to the next `get` of the
/// same path.
pub trait DataSource {
    fn kind(&self) -> DataKind;

    /// Value at `path`, or `None` if any segment fails to resolve.
    fn get(&self, path: &str) -> Option<Value>;

    /// Write `value` at `path`.
    fn set(&mut self, path: &str, value: Value) -> Result<()>;

    fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Uploaded files, for sources that carry them.
    fn files(&self) -> Option<&BTreeMap<String, FormFile>> {
        None
    }

    /// Snapshot of every top-level field.
    fn to_map(&self) -> BTreeMap<String, Value>;
}
