/// Structured settings and metadata bags
///
/// Several columns hold free-form key/value data (`preferences`,
/// `custom_voice_settings`, `voice_settings`, `enhancement_settings`,
/// `log_metadata`, `sections`). Instead of an arbitrary JSON blob they are
/// typed as a [`FieldMap`]: string keys mapping to a closed set of value
/// shapes. `null` is not a member, so a bag never carries "unset" keys.
///
/// Stored as JSONB. Numbers keep the exact text they were written with, so
/// `1.50` stays `1.50` and integers wider than 64 bits are not squeezed into
/// a float.
///
/// # Example
///
/// ```
/// use castwright_shared::field_map::{FieldMap, FieldValue};
///
/// let bag: FieldMap = serde_json::from_str(r#"{"speed": 1.25, "accent": "uk"}"#).unwrap();
/// assert_eq!(bag.get("accent"), Some(&FieldValue::from("uk")));
/// ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Key/value bag stored as JSONB
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A value inside a [`FieldMap`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<FieldValue>),
    Map(FieldMap),
}

// Decoded through `Value` so numbers arrive as their original text
impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        FieldValue::try_from(value).map_err(de::Error::custom)
    }
}

impl TryFrom<Value> for FieldValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Err("null is not a valid field value".to_string()),
            Value::Bool(b) => Ok(FieldValue::Bool(b)),
            Value::Number(n) => Ok(FieldValue::Number(n)),
            Value::String(s) => Ok(FieldValue::String(s)),
            Value::Array(items) => items
                .into_iter()
                .map(FieldValue::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List),
            Value::Object(entries) => entries
                .into_iter()
                .map(|(key, value)| FieldValue::try_from(value).map(|v| (key, v)))
                .collect::<Result<FieldMap, _>>()
                .map(FieldValue::Map),
        }
    }
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

impl From<FieldMap> for FieldValue {
    fn from(value: FieldMap) -> Self {
        FieldValue::Map(value)
    }
}
