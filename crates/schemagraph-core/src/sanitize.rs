//! Input sanitization policy.
//!
//! Values are always sent as statement parameters, so this policy is a second
//! line against statement injection for stores or callers that interpolate.
//! It is a single deny-list: a string value is illegal if it contains any
//! character in [`DISALLOWED_CHARS`]. Numbers, booleans and null always pass;
//! arrays and maps are checked element by element.
//!
//! Keys are different: they are written into the statement text as property
//! names, so they must be plain identifiers and are checked even when value
//! checks are bypassed.

use serde_json::Value;

use crate::error::CoreError;
use crate::types::Properties;

/// Characters that may not appear in a checked string value.
pub const DISALLOWED_CHARS: &[char] = &[
    '{', '}', '(', ')', '[', ']', ':', ';', '\'', '"', '`', '\\',
];

/// Whether value checks run for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    #[default]
    Enforce,
    /// Skip value checks for this one operation. Key checks still run.
    SkipValues,
}

/// A plain identifier: ASCII letter or underscore, then letters, digits or
/// underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Require `name` to be a plain identifier (labels, relationship types).
pub fn check_identifier(name: &str) -> Result<(), CoreError> {
    if is_identifier(name) {
        Ok(())
    } else {
        tracing::warn!(identifier = %name.escape_debug(), "Rejected illegal identifier");
        Err(CoreError::IllegalIdentifier {
            name: name.to_string(),
        })
    }
}

pub fn is_legal_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.contains(DISALLOWED_CHARS),
        Value::Array(items) => items.iter().all(is_legal_value),
        Value::Object(map) => map.values().all(is_legal_value),
    }
}

/// Check every key and value of a bag. Stops at the first offending entry.
pub fn check_properties(props: &Properties, validation: Validation) -> Result<(), CoreError> {
    for (key, value) in props.iter() {
        if !is_identifier(key) {
            tracing::warn!(key = %key.escape_debug(), "Rejected illegal property key");
            return Err(CoreError::IllegalKey {
                key: key.to_string(),
            });
        }
        if validation == Validation::SkipValues || value.is_exempt() {
            continue;
        }
        if !is_legal_value(value.value()) {
            tracing::warn!(key = %key, "Rejected illegal property value");
            return Err(CoreError::IllegalValue {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}
