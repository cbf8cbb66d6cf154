//! Primitive-only property model
//!
//! The target graph engine rejects nested property values, so every node and
//! edge write flattens its metadata first: primitive scalars and homogeneous
//! arrays of primitives pass through, heterogeneous arrays are coerced
//! element-wise to strings, nested maps and nulls are dropped. The function is
//! pure and total over arbitrary JSON so the invariant can be tested without
//! any storage engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::JsonMap;

/// A property value the graph engine accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Integer(i64),
    /// Float scalar
    Float(f64),
    /// String scalar
    String(String),
    /// Homogeneous boolean array
    BoolList(Vec<bool>),
    /// Homogeneous integer array
    IntegerList(Vec<i64>),
    /// Homogeneous float array
    FloatList(Vec<f64>),
    /// String array (also the coercion target for mixed arrays)
    StringList(Vec<String>),
}

impl PropertyValue {
    /// Render back to JSON (used by stores that persist metadata as JSON).
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Integer(i) => Value::from(*i),
            PropertyValue::Float(f) => Value::from(*f),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::BoolList(items) => items.iter().copied().collect(),
            PropertyValue::IntegerList(items) => items.iter().copied().collect(),
            PropertyValue::FloatList(items) => items.iter().copied().collect(),
            PropertyValue::StringList(items) => items.iter().cloned().map(Value::from).collect(),
        }
    }
}

/// Flatten an arbitrary metadata map to the primitive-only property model.
///
/// Keys whose values cannot be represented (nested maps, nulls) are absent
/// from the result rather than erroring: malformed metadata is dropped at the
/// smallest possible scope.
pub fn flatten_properties(metadata: &JsonMap) -> BTreeMap<String, PropertyValue> {
    let mut flattened = BTreeMap::new();
    for (key, value) in metadata {
        if let Some(prop) = flatten_value(value) {
            flattened.insert(key.clone(), prop);
        }
    }
    flattened
}

/// Render a flattened property map back to JSON.
pub fn properties_to_json(properties: &BTreeMap<String, PropertyValue>) -> JsonMap {
    properties
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

fn flatten_value(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(PropertyValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(PropertyValue::Integer(i))
            } else {
                n.as_f64().map(PropertyValue::Float)
            }
        }
        Value::String(s) => Some(PropertyValue::String(s.clone())),
        Value::Array(items) => Some(flatten_array(items)),
        Value::Object(_) => None,
    }
}

fn flatten_array(items: &[Value]) -> PropertyValue {
    if items.is_empty() {
        return PropertyValue::StringList(Vec::new());
    }
    if items.iter().all(Value::is_boolean) {
        return PropertyValue::BoolList(items.iter().filter_map(Value::as_bool).collect());
    }
    if items.iter().all(|v| v.as_i64().is_some()) {
        return PropertyValue::IntegerList(items.iter().filter_map(Value::as_i64).collect());
    }
    if items.iter().all(Value::is_number) {
        return PropertyValue::FloatList(items.iter().filter_map(Value::as_f64).collect());
    }
    if items.iter().all(Value::is_string) {
        return PropertyValue::StringList(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        );
    }

    // Mixed or non-primitive elements: coerce each element to a string
    PropertyValue::StringList(items.iter().map(coerce_to_string).collect())
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
