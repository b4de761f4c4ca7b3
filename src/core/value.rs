//! Structured value model
//!
//! [`StructuredValue`] is the canonical, JSON-compatible shape of everything
//! that ends up in an entry payload. Attribute values of every kind are
//! converted into it before they are written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field set of a structured object
pub type Map = BTreeMap<String, StructuredValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(Map),
}

impl StructuredValue {
    /// Convert a generic JSON tree.
    ///
    /// Arrays have no counterpart in the model and become objects keyed by
    /// the decimal index of each element.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => StructuredValue::Null,
            serde_json::Value::Bool(b) => StructuredValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(StructuredValue::Number)
                .unwrap_or(StructuredValue::Null),
            serde_json::Value::String(s) => StructuredValue::String(s),
            serde_json::Value::Array(items) => StructuredValue::Object(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| (idx.to_string(), StructuredValue::from_json(item)))
                    .collect(),
            ),
            serde_json::Value::Object(fields) => StructuredValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, StructuredValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            StructuredValue::Null => serde_json::Value::Null,
            StructuredValue::Bool(b) => serde_json::Value::Bool(*b),
            StructuredValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            StructuredValue::String(s) => serde_json::Value::String(s.clone()),
            StructuredValue::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            StructuredValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StructuredValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StructuredValue::Null)
    }

    /// Borrow this value as an object, replacing it with an empty one first
    /// if it holds anything else.
    pub fn make_object(&mut self) -> &mut Map {
        if !matches!(self, StructuredValue::Object(_)) {
            *self = StructuredValue::Object(Map::new());
        }
        match self {
            StructuredValue::Object(fields) => fields,
            _ => unreachable!("value was replaced by an object above"),
        }
    }
}

impl fmt::Display for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_value())
    }
}

impl From<String> for StructuredValue {
    fn from(s: String) -> Self {
        StructuredValue::String(s)
    }
}

impl From<&str> for StructuredValue {
    fn from(s: &str) -> Self {
        StructuredValue::String(s.to_string())
    }
}

impl From<f64> for StructuredValue {
    fn from(n: f64) -> Self {
        StructuredValue::Number(n)
    }
}

impl From<bool> for StructuredValue {
    fn from(b: bool) -> Self {
        StructuredValue::Bool(b)
    }
}

impl From<Map> for StructuredValue {
    fn from(fields: Map) -> Self {
        StructuredValue::Object(fields)
    }
}

/// Get or create the object stored under `key`
pub fn object_entry<'a>(fields: &'a mut Map, key: &str) -> &'a mut Map {
    fields
        .entry(key.to_string())
        .or_insert_with(|| StructuredValue::Object(Map::new()))
        .make_object()
}

/// Descend `path` from `root`, creating objects on demand
pub fn object_at_path<'a>(root: &'a mut Map, path: &[String]) -> &'a mut Map {
    path.iter().fold(root, |current, key| object_entry(current, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(StructuredValue::from_json(json!(null)), StructuredValue::Null);
        assert_eq!(StructuredValue::from_json(json!(true)), StructuredValue::Bool(true));
        assert_eq!(StructuredValue::from_json(json!(32)), StructuredValue::Number(32.0));
        assert_eq!(
            StructuredValue::from_json(json!("cow")),
            StructuredValue::String("cow".into())
        );
    }

    #[test]
    fn test_from_json_arrays_become_indexed_objects() {
        let value = StructuredValue::from_json(json!(["a", 2]));
        let fields = value.as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["0"], StructuredValue::from("a"));
        assert_eq!(fields["1"], StructuredValue::Number(2.0));
    }

    #[test]
    fn test_json_roundtrip_of_object() {
        let original = json!({"id": "user-1", "age": 32.0, "manager": null, "nested": {"ok": true}});
        let value = StructuredValue::from_json(original.clone());
        assert_eq!(value.to_json_value(), original);
    }

    #[test]
    fn test_serialize_untagged() {
        let mut fields = Map::new();
        fields.insert("a".into(), StructuredValue::Number(1.0));
        fields.insert("b".into(), StructuredValue::from("two"));
        let json = serde_json::to_string(&StructuredValue::Object(fields)).unwrap();
        assert_eq!(json, r#"{"a":1.0,"b":"two"}"#);
    }

    #[test]
    fn test_object_at_path_creates_and_replaces() {
        let mut root = Map::new();
        root.insert("g".into(), StructuredValue::Number(1.0));

        let path = vec!["g".to_string(), "h".to_string()];
        object_at_path(&mut root, &path).insert("k".into(), StructuredValue::Bool(true));

        let g = root["g"].as_object().unwrap();
        let h = g["h"].as_object().unwrap();
        assert_eq!(h["k"], StructuredValue::Bool(true));
    }
}
