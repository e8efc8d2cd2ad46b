//! Ordered collection of per-path validation errors.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// The value recorded for a failed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValue {
    /// A (translated) message
    Message(String),
    /// Failed without a message; serializes as `false`
    Failed,
}

impl ErrorValue {
    /// Returns the message, if any.
    pub fn as_message(&self) -> Option<&str> {
        match self {
            ErrorValue::Message(message) => Some(message),
            ErrorValue::Failed => None,
        }
    }

    /// Converts to the JSON representation (`"message"` or `false`).
    pub fn to_json(&self) -> Value {
        match self {
            ErrorValue::Message(message) => Value::String(message.clone()),
            ErrorValue::Failed => Value::Bool(false),
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorValue::Message(message) => write!(f, "{message}"),
            ErrorValue::Failed => write!(f, "false"),
        }
    }
}

impl From<&str> for ErrorValue {
    fn from(message: &str) -> Self {
        ErrorValue::Message(message.to_string())
    }
}

impl From<String> for ErrorValue {
    fn from(message: String) -> Self {
        ErrorValue::Message(message)
    }
}

impl Serialize for ErrorValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ErrorValue::Message(message) => serializer.serialize_str(message),
            ErrorValue::Failed => serializer.serialize_bool(false),
        }
    }
}

/// One entry returned by `get_next_error`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: ErrorValue,
}

/// Errors keyed by path, in first-recorded order.
///
/// Recording a key twice replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    entries: Vec<(String, ErrorValue)>,
    index: HashMap<String, usize>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` under `key`.
    pub fn record(&mut self, key: impl Into<String>, value: ErrorValue) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ErrorValue> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in recorded order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the entry at `position` in recorded order.
    pub(crate) fn entry(&self, position: usize) -> Option<FieldError> {
        self.entries.get(position).map(|(field, message)| FieldError {
            field: field.clone(),
            message: message.clone(),
        })
    }

    /// Converts to an ordered JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for ErrorMap
where
    K: Into<String>,
    V: Into<ErrorValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ErrorMap::new();
        for (key, value) in iter {
            map.record(key, value.into());
        }
        map
    }
}

impl IntoIterator for ErrorMap {
    type Item = (String, ErrorValue);
    type IntoIter = std::vec::IntoIter<(String, ErrorValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
