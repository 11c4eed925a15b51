//! Forward redaction

use crate::patterns::{is_sensitive_key, matchers};
use argus_record::RedactionMap;
use regex::Captures;
use serde_json::Value;
use tracing::debug;

/// Redact `value` into a fresh map.
///
/// The output has the same shape as the input. Strings are scanned for
/// SSN, phone and email patterns; non-empty strings under a sensitive key
/// are replaced whole, with the upper-cased key as category.
#[must_use]
pub fn mask(value: &Value) -> (Value, RedactionMap) {
    let mut mapping = RedactionMap::new();
    let redacted = mask_with(value, &mut mapping);
    (redacted, mapping)
}

/// Redact `value`, extending an existing map. Values already mapped keep
/// their placeholder.
pub fn mask_with(value: &Value, mapping: &mut RedactionMap) -> Value {
    let before = mapping.len();
    let redacted = mask_value(value, mapping);
    debug!(
        new_entries = mapping.len() - before,
        total_entries = mapping.len(),
        "masked sensitive values"
    );
    redacted
}

fn mask_value(value: &Value, mapping: &mut RedactionMap) -> Value {
    match value {
        Value::String(text) => Value::String(mask_text(text, mapping)),
        Value::Array(items) => Value::Array(items.iter().map(|v| mask_value(v, mapping)).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, v)| {
                    let masked = match v {
                        Value::String(s) if !s.is_empty() && is_sensitive_key(key) => {
                            Value::String(mapping.get_or_insert(key, s))
                        }
                        _ => mask_value(v, mapping),
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn mask_text(text: &str, mapping: &mut RedactionMap) -> String {
    let mut result = text.to_string();
    for (category, pattern) in matchers() {
        result = pattern
            .replace_all(&result, |caps: &Captures<'_>| {
                mapping.get_or_insert(category, &caps[0])
            })
            .into_owned();
    }
    result
}
