//! Core value types shared by the statement builder and the entity models.
//!
//! Property bags are ordered: keys render into statements in insertion order,
//! so the same bag always produces the same statement text.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ── Named Constants ───────────────────────────────────────────────

/// Relation target meaning "the same label as the owning model".
pub const SELF_LABEL: &str = "__self__";

/// Direction used when a relation declaration does not name one.
pub const DEFAULT_DIRECTION: Direction = Direction::To;

// ── Property Values ───────────────────────────────────────────────

/// A single value in a property bag.
///
/// `Unchecked` values skip the sanitization policy. They are still bound as
/// statement parameters, never interpolated into the statement text.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Checked(Value),
    Unchecked(Value),
}

impl PropertyValue {
    pub fn checked(value: impl Into<Value>) -> Self {
        Self::Checked(value.into())
    }

    pub fn unchecked(value: impl Into<Value>) -> Self {
        Self::Unchecked(value.into())
    }

    pub fn value(&self) -> &Value {
        match self {
            Self::Checked(v) | Self::Unchecked(v) => v,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Checked(v) | Self::Unchecked(v) => v,
        }
    }

    pub fn is_exempt(&self) -> bool {
        matches!(self, Self::Unchecked(_))
    }
}

// ── Property Bags ─────────────────────────────────────────────────

/// An ordered property bag. Inserting an existing key replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a checked value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, PropertyValue::checked(value));
        self
    }

    /// Builder-style insert of a value exempt from sanitization.
    pub fn with_unchecked(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, PropertyValue::unchecked(value));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a bag from any value that serializes to a map, e.g. an entity
    /// record or a partial struct. Every value is checked.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, CoreError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(map.into()),
            other => Err(CoreError::NotAMap {
                found: json_type_name(&other),
            }),
        }
    }
}

impl From<serde_json::Map<String, Value>> for Properties {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            props.insert(k, PropertyValue::Checked(v));
        }
        props
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Relationships ─────────────────────────────────────────────────

/// Direction of a relationship pattern, seen from the left-hand node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `-[...]->`
    #[serde(alias = ">")]
    To,
    /// `<-[...]-`
    #[serde(alias = "<")]
    From,
    /// `-[...]-`
    #[serde(rename = "none")]
    Undirected,
}

impl Default for Direction {
    fn default() -> Self {
        DEFAULT_DIRECTION
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "to" | ">" => Ok(Self::To),
            "from" | "<" => Ok(Self::From),
            "none" => Ok(Self::Undirected),
            _ => Err(format!("Invalid direction: {s}. Choose: to, from, none")),
        }
    }
}

/// Destination label of a declared relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationTarget {
    /// The owning model's own label.
    SelfLabel,
    Label(String),
}

impl RelationTarget {
    /// Resolve the self sentinel against the owner's label.
    pub fn resolve<'a>(&'a self, owner: &'a str) -> &'a str {
        match self {
            Self::SelfLabel => owner,
            Self::Label(label) => label,
        }
    }
}

impl From<&str> for RelationTarget {
    fn from(s: &str) -> Self {
        if s == SELF_LABEL {
            Self::SelfLabel
        } else {
            Self::Label(s.to_string())
        }
    }
}

impl From<String> for RelationTarget {
    fn from(s: String) -> Self {
        if s == SELF_LABEL {
            Self::SelfLabel
        } else {
            Self::Label(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Movie {
        title: String,
        rating: i64,
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let props = Properties::new()
            .with("a", 1)
            .with("b", 2)
            .with_unchecked("a", "x");
        let keys: Vec<_> = props.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(props.get("a"), Some(&PropertyValue::Unchecked(json!("x"))));
    }

    #[test]
    fn test_from_serialize_keeps_field_order() {
        let props = Properties::from_serialize(&Movie {
            title: "hello".to_string(),
            rating: 2,
        })
        .unwrap();
        let keys: Vec<_> = props.keys().collect();
        assert_eq!(keys, vec!["title", "rating"]);
        assert!(!props.get("title").unwrap().is_exempt());
    }

    #[test]
    fn test_from_serialize_rejects_scalars() {
        let err = Properties::from_serialize(&42).unwrap_err();
        assert!(matches!(err, CoreError::NotAMap { found: "number" }));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("to".parse::<Direction>().unwrap(), Direction::To);
        assert_eq!(">".parse::<Direction>().unwrap(), Direction::To);
        assert_eq!("FROM".parse::<Direction>().unwrap(), Direction::From);
        assert_eq!("<".parse::<Direction>().unwrap(), Direction::From);
        assert_eq!("none".parse::<Direction>().unwrap(), Direction::Undirected);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::default(), Direction::To);
    }

    #[test]
    fn test_relation_target_sentinel() {
        assert_eq!(RelationTarget::from(SELF_LABEL), RelationTarget::SelfLabel);
        assert_eq!(RelationTarget::from(SELF_LABEL).resolve("Test"), "Test");
        assert_eq!(RelationTarget::from("User").resolve("Test"), "User");
    }
}
