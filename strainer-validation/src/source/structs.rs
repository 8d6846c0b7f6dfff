use super::{DataKind, DataSource};
use crate::errors::{Error, Result};
use crate::path;
use crate::traits::Structured;
use crate::value::Value;
use std::collections::BTreeMap;

enum Target<'a> {
    Mut(&'a mut dyn Structured),
    Ref(&'a dyn Structured),
}

/// A struct seen through its [`Structured`] impl.
///
/// Built from `&mut T` the struct receives filtered and default values;
/// built from `&T` every write fails with [`Error::FieldNotSettable`].
pub struct StructData<'a> {
    target: Target<'a>,
    names: Vec<String>,
}

impl<'a> StructData<'a> {
    pub fn new(target: &'a mut dyn Structured) -> Self {
        let names = target.fields().into_iter().map(|f| f.name).collect();
        Self {
            target: Target::Mut(target),
            names,
        }
    }

    pub fn read_only(target: &'a dyn Structured) -> Self {
        let names = target.fields().into_iter().map(|f| f.name).collect();
        Self {
            target: Target::Ref(target),
            names,
        }
    }

    fn inner(&self) -> &dyn Structured {
        match &self.target {
            Target::Mut(t) => &**t,
            Target::Ref(t) => *t,
        }
    }

    /// Declared field name matching `name`, exact first then ignoring case.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|n| n.as_str() == name)
            .or_else(|| self.names.iter().find(|n| n.eq_ignore_ascii_case(name)))
            .map(String::as_str)
    }

    fn get_top(&self, name: &str) -> Option<Value> {
        let inner = self.inner();
        inner
            .get_field(name)
            .or_else(|| self.resolve(name).and_then(|n| inner.get_field(n)))
    }
}

impl DataSource for StructData<'_> {
    fn kind(&self) -> DataKind {
        DataKind::Struct
    }

    fn get(&self, field: &str) -> Option<Value> {
        if let Some(value) = self.get_top(field) {
            return Some(value);
        }

        let segs = path::segments(field);
        let (first, rest) = segs.split_first()?;
        if rest.is_empty() {
            return None;
        }
        path::get(&self.get_top(first)?, rest)
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let segs = path::segments(field);
        let top = segs.first().copied().unwrap_or(field);
        let name = self
            .resolve(top)
            .map(str::to_string)
            .ok_or_else(|| Error::FieldNotFound(field.to_string()))?;

        let value = if segs.len() > 1 {
            let mut root = self.get_top(&name).unwrap_or_default();
            if !path::set(&mut root, &segs[1..], value) {
                return Err(Error::FieldNotSettable(field.to_string()));
            }
            root
        } else {
            value
        };

        match &mut self.target {
            Target::Mut(t) => t.set_field(&name, value),
            Target::Ref(_) => Err(Error::FieldNotSettable(field.to_string())),
        }
    }

    fn to_map(&self) -> BTreeMap<String, Value> {
        let inner = self.inner();
        self.names
            .iter()
            .filter_map(|name| inner.get_field(name).map(|v| (name.clone(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FieldSpec;

    #[derive(Default)]
    struct Profile {
        name: String,
        age: Option<i64>,
        tags: Vec<String>,
    }

    impl Structured for Profile {
        fn fields(&self) -> Vec<FieldSpec> {
            vec![
                FieldSpec::new("Name"),
                FieldSpec::new("Age"),
                FieldSpec::new("Tags"),
            ]
        }

        fn get_field(&self, name: &str) -> Option<Value> {
            match name {
                "Name" => Some(Value::from(&self.name)),
                "Age" => Some(Value::from(self.age)),
                "Tags" => Some(Value::from(self.tags.clone())),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
            let mismatch = || Error::BindMismatch {
                field: name.to_string(),
                reason: "wrong type".to_string(),
            };
            match name {
                "Name" => self.name = value.to().ok_or_else(mismatch)?,
                "Age" => self.age = value.to().ok_or_else(mismatch)?,
                "Tags" => self.tags = value.to().ok_or_else(mismatch)?,
                _ => return Err(Error::FieldNotFound(name.to_string())),
            }
            Ok(())
        }
    }

    #[test]
    fn test_get_case_insensitive() {
        let mut profile = Profile {
            name: "tom".to_string(),
            ..Default::default()
        };
        let data = StructData::new(&mut profile);

        assert_eq!(data.get("Name"), Some(Value::from("tom")));
        assert_eq!(data.get("name"), Some(Value::from("tom")));
        assert_eq!(data.get("Age"), Some(Value::Null));
        assert_eq!(data.get("email"), None);
    }

    #[test]
    fn test_set_writes_back() {
        let mut profile = Profile::default();
        {
            let mut data = StructData::new(&mut profile);
            data.set("name", Value::from("jane")).unwrap();
            data.set("Age", Value::Int(0)).unwrap();
            assert_eq!(data.get("Name"), Some(Value::from("jane")));
        }
        assert_eq!(profile.name, "jane");
        assert_eq!(profile.age, Some(0));
    }

    #[test]
    fn test_nested_list_path() {
        let mut profile = Profile {
            tags: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let mut data = StructData::new(&mut profile);

        assert_eq!(data.get("Tags.1"), Some(Value::from("b")));
        data.set("Tags.0", Value::from("z")).unwrap();
        assert_eq!(data.get("Tags"), Some(Value::from(vec!["z", "b"])));
    }

    #[test]
    fn test_set_errors() {
        let profile = Profile::default();
        let mut data = StructData::read_only(&profile);

        assert!(matches!(
            data.set("Name", Value::from("x")),
            Err(Error::FieldNotSettable(_))
        ));
        assert!(matches!(
            data.set("Email", Value::from("x")),
            Err(Error::FieldNotFound(_))
        ));
    }
}
