use std::{
    collections::{btree_map, BTreeMap},
    fmt,
};

use serde_json::Value as JsonValue;

use crate::{FormValue, HttpClientError, Result, Scalar};

/// Field set of a single form request, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Form {
    fields: BTreeMap<String, FormValue>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any previous value under the same key.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FormValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any field is a file reference, which selects multipart encoding.
    pub fn has_file(&self) -> bool {
        self.fields.values().any(FormValue::is_file)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FormValue> {
        self.fields.iter()
    }

    /// Builds a form from a JSON object.
    ///
    /// Accepted shapes per field: string or number, array of those, object
    /// of those, array of such objects. Anything else (null, booleans,
    /// deeper nesting, mixed arrays) fails with
    /// [`HttpClientError::UnsupportedType`] naming the field.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        let JsonValue::Object(object) = value else {
            return Err(HttpClientError::UnsupportedType {
                key: "<root>".to_owned(),
            });
        };

        let mut form = Self::new();
        for (key, value) in object {
            let value = json_field(&key, value)?;
            form.fields.insert(key, value);
        }
        Ok(form)
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (key, value)) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

impl<'a> IntoIterator for &'a Form {
    type Item = (&'a String, &'a FormValue);
    type IntoIter = btree_map::Iter<'a, String, FormValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Form
where
    K: Into<String>,
    V: Into<FormValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Form
where
    K: Into<String>,
    V: Into<FormValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

fn json_field(key: &str, value: JsonValue) -> Result<FormValue> {
    let unsupported = || HttpClientError::UnsupportedType {
        key: key.to_owned(),
    };

    match value {
        JsonValue::Array(items) => {
            if items.iter().all(JsonValue::is_object) && !items.is_empty() {
                items
                    .into_iter()
                    .map(|item| json_map(item).ok_or_else(unsupported))
                    .collect::<Result<Vec<_>>>()
                    .map(FormValue::MapList)
            } else {
                items
                    .into_iter()
                    .map(|item| json_scalar(item).ok_or_else(unsupported))
                    .collect::<Result<Vec<_>>>()
                    .map(FormValue::List)
            }
        }
        JsonValue::Object(_) => json_map(value).map(FormValue::Map).ok_or_else(unsupported),
        other => json_scalar(other)
            .map(FormValue::Scalar)
            .ok_or_else(unsupported),
    }
}

fn json_map(value: JsonValue) -> Option<BTreeMap<String, Scalar>> {
    let JsonValue::Object(object) = value else {
        return None;
    };
    object
        .into_iter()
        .map(|(key, value)| json_scalar(value).map(|scalar| (key, scalar)))
        .collect()
}

fn json_scalar(value: JsonValue) -> Option<Scalar> {
    match value {
        JsonValue::String(text) => Some(Scalar::Text(text)),
        JsonValue::Number(number) => number
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| number.as_u64().map(Scalar::Uint64))
            .or_else(|| number.as_f64().map(Scalar::Float)),
        _ => None,
    }
}
