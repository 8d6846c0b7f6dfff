use super::{DataKind, DataSource};
use crate::errors::{Error, Result};
use crate::path;
use crate::value::Value;
use std::collections::BTreeMap;

/// Generic key/value data, e.g. a decoded JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapData {
    data: BTreeMap<String, Value>,
}

impl MapData {
    pub fn new(data: BTreeMap<String, Value>) -> Self {
        Self { data }
    }

    /// Build from a JSON value, which must be an object.
    pub fn from_json_value(json: serde_json::Value) -> Result<Self> {
        match Value::from(json) {
            Value::Map(data) => Ok(Self { data }),
            other => Err(Error::InvalidDataSource(format!(
                "expected a JSON object, got {}",
                other.kind()
            ))),
        }
    }

    /// Parse a JSON document, which must be an object.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_slice(body)?;
        Self::from_json_value(json)
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.data
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl DataSource for MapData {
    fn kind(&self) -> DataKind {
        DataKind::Map
    }

    fn get(&self, field: &str) -> Option<Value> {
        path::get_in_map(&self.data, field)
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        if self.data.contains_key(field) || !field.contains(path::SEPARATOR) {
            self.data.insert(field.to_string(), value);
            return Ok(());
        }

        let segs = path::segments(field);
        let (first, rest) = segs
            .split_first()
            .ok_or_else(|| Error::FieldNotSettable(field.to_string()))?;
        let root = self.data.entry(first.to_string()).or_default();

        if path::set(root, rest, value) {
            Ok(())
        } else {
            Err(Error::FieldNotSettable(field.to_string()))
        }
    }

    fn to_map(&self) -> BTreeMap<String, Value> {
        self.data.clone()
    }
}
