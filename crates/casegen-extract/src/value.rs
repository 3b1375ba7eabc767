//! Closed set of shapes a generator response may take
//!
//! Generator output is either a JSON array or a JSON object. Scalars are not
//! representable, so a successful extraction can never degrade into an
//! implicit empty default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A parsed generator response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredValue {
    /// Top-level JSON array
    Array(Vec<Value>),
    /// Top-level JSON object
    Object(Map<String, Value>),
}

impl StructuredValue {
    /// Convert a parsed JSON value, rejecting scalars
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(Self::Array(items)),
            Value::Object(map) => Some(Self::Object(map)),
            _ => None,
        }
    }

    /// Back into a plain JSON value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Array(items) => Value::Array(items),
            Self::Object(map) => Value::Object(map),
        }
    }

    /// Array items, if this is an array
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            Self::Object(_) => None,
        }
    }

    /// Object map, if this is an object
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Array(_) => None,
            Self::Object(map) => Some(map),
        }
    }

    /// Look up a key on an object response
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Object items of a list response.
    ///
    /// A bare array yields its object elements. An object yields the object
    /// elements of the first of `keys` that holds an array. Anything else
    /// yields `None`.
    #[must_use]
    pub fn object_items(&self, keys: &[&str]) -> Option<Vec<&Map<String, Value>>> {
        let items = match self {
            Self::Array(items) => items.as_slice(),
            Self::Object(map) => keys
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))?
                .as_slice(),
        };
        Some(items.iter().filter_map(Value::as_object).collect())
    }

    /// Short shape label for diagnostics
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl From<StructuredValue> for Value {
    fn from(value: StructuredValue) -> Self {
        value.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_are_rejected() {
        assert!(StructuredValue::from_value(json!(1)).is_none());
        assert!(StructuredValue::from_value(json!("x")).is_none());
        assert!(StructuredValue::from_value(Value::Null).is_none());
    }

    #[test]
    fn object_items_from_bare_array() {
        let value = StructuredValue::from_value(json!([{"a": 1}, 2, {"b": 2}])).unwrap();
        let items = value.object_items(&["cases"]).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn object_items_from_wrapped_array() {
        let value =
            StructuredValue::from_value(json!({"module": "m", "points": [{"name": "p"}]}))
                .unwrap();
        let items = value.object_items(&["test_points", "points"]).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "p");
        assert!(value.object_items(&["cases"]).is_none());
    }

    #[test]
    fn serializes_untagged() {
        let value = StructuredValue::from_value(json!({"k": [1, 2]})).unwrap();
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"k": [1, 2]}));
        assert_eq!(value.kind(), "object");
    }
}
