use super::{DataKind, DataSource};
use crate::errors::{Error, Result};
use crate::path::{self, WILDCARD};
use crate::request::FormFile;
use crate::value::Value;
use std::collections::BTreeMap;

/// URL-encoded or multipart form values plus uploaded files.
///
/// Every field holds a list of strings; a single value reads back as a
/// string, several as a list.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    form: BTreeMap<String, Vec<String>>,
    files: BTreeMap<String, FormFile>,
}

impl FormData {
    pub fn new(form: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            form,
            files: BTreeMap::new(),
        }
    }

    /// Parse an `application/x-www-form-urlencoded` string.
    pub fn parse(input: &str) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(input)?;
        Ok(pairs.into_iter().collect())
    }

    /// Parse URL-encoded bytes, e.g. a request body.
    pub fn parse_bytes(body: &[u8]) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
        Ok(pairs.into_iter().collect())
    }

    /// Attach uploaded files.
    pub fn with_files(mut self, files: BTreeMap<String, FormFile>) -> Self {
        self.files = files;
        self
    }

    /// Append a value to a field.
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.form.entry(field.into()).or_default().push(value.into());
    }

    /// Add an uploaded file.
    pub fn add_file(&mut self, field: impl Into<String>, file: FormFile) {
        self.files.insert(field.into(), file);
    }

    /// Merge another form over this one; its fields win.
    pub fn merge(&mut self, other: FormData) {
        self.form.extend(other.form);
        self.files.extend(other.files);
    }

    /// Raw values of a field.
    pub fn values(&self, field: &str) -> Option<&[String]> {
        self.form
            .get(field)
            .or_else(|| self.form.get(&format!("{}[]", field)))
            .map(Vec::as_slice)
    }

    fn field_value(values: &[String]) -> Value {
        match values {
            [single] => Value::from(single.as_str()),
            many => Value::List(many.iter().map(Value::from).collect()),
        }
    }

    fn to_strings(field: &str, value: &Value) -> Result<Vec<String>> {
        let unsupported = |kind| Error::UnsupportedValue {
            field: field.to_string(),
            kind,
        };

        match value.inner() {
            Value::Map(_) => Err(unsupported(value.kind())),
            Value::List(items) => items
                .iter()
                .map(|item| {
                    if item.is_scalar() {
                        Ok(item.to_string())
                    } else {
                        Err(unsupported(item.kind()))
                    }
                })
                .collect(),
            scalar => Ok(vec![scalar.to_string()]),
        }
    }
}

impl FromIterator<(String, String)> for FormData {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut data = FormData::default();
        for (field, value) in iter {
            data.add(field, value);
        }
        data
    }
}

impl DataSource for FormData {
    fn kind(&self) -> DataKind {
        DataKind::Form
    }

    fn get(&self, field: &str) -> Option<Value> {
        if let Some(values) = self.values(field) {
            return Some(Self::field_value(values));
        }
        if let Some(file) = self.files.get(field) {
            return Some(Value::from(file.filename.as_str()));
        }

        // `tags.*` and `tags.0` address the values of a repeated field
        let (base, index) = field.rsplit_once(path::SEPARATOR)?;
        let values = self.values(base)?;
        if index == WILDCARD {
            return Some(Value::List(values.iter().map(Value::from).collect()));
        }
        index
            .parse::<usize>()
            .ok()
            .and_then(|i| values.get(i))
            .map(Value::from)
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let values = Self::to_strings(field, &value)?;
        self.form.insert(field.to_string(), values);
        Ok(())
    }

    fn has(&self, field: &str) -> bool {
        self.values(field).is_some() || self.files.contains_key(field) || self.get(field).is_some()
    }

    fn files(&self) -> Option<&BTreeMap<String, FormFile>> {
        Some(&self.files)
    }

    fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map: BTreeMap<String, Value> = self
            .form
            .iter()
            .map(|(field, values)| (field.clone(), Self::field_value(values)))
            .collect();
        for (field, file) in &self.files {
            map.entry(field.clone())
                .or_insert_with(|| Value::from(file.filename.as_str()));
        }
        map
    }
}
