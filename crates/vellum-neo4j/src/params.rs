//! Cypher parameter building and identifier sanitisation
//!
//! Property values are always bound as parameters. Labels, relationship
//! types and property keys cannot be parameterised in Cypher, so anything
//! interpolated into query text is sanitised here first.

use neo4rs::BoltType;
use vellum_core::PropertyValue;

/// Convert a flattened property value to its Bolt representation.
pub(crate) fn bolt_value(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Bool(b) => (*b).into(),
        PropertyValue::Integer(i) => (*i).into(),
        PropertyValue::Float(f) => (*f).into(),
        PropertyValue::String(s) => s.clone().into(),
        PropertyValue::BoolList(items) => items.clone().into(),
        PropertyValue::IntegerList(items) => items.clone().into(),
        PropertyValue::FloatList(items) => items.clone().into(),
        PropertyValue::StringList(items) => items.clone().into(),
    }
}

/// Sanitise a metadata key for use as a property name / parameter suffix.
///
/// Keys come from parsed documents and LLM output, so anything outside
/// `[A-Za-z0-9_]` is replaced; a key that does not start with a letter is
/// prefixed.
pub(crate) fn property_key(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !out.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        out.insert_str(0, "p_");
    }
    out
}

/// Sanitise an extractor-supplied relationship type for interpolation.
///
/// Uppercased, restricted to `[A-Z0-9_]`, must start with a letter; empty or
/// unusable input falls back to `RELATES_TO`.
pub(crate) fn relationship_type(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .to_ascii_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if cleaned.chars().any(|c| c.is_ascii_alphanumeric()) {
        if cleaned.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            cleaned
        } else {
            format!("R_{cleaned}")
        }
    } else {
        "RELATES_TO".to_string()
    }
}
