//! Attribute values and per-element attribute bags
//!
//! Every graph, node and edge carries an [`Attributes`] bag. The bag itself
//! never talks to listeners: each mutation returns the [`AttributeChange`]s it
//! caused, and the store turns those into events.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dynamically typed attribute value
///
/// Supports:
/// - Boolean
/// - Integer (i64)
/// - Number (f64)
/// - Text
/// - Vector (numeric coordinates, colors, sizes)
/// - List (heterogeneous values)
/// - Map (nested attributes)
/// - Bytes (opaque blob)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Vector(Vec<f64>),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// True for integers and floating point numbers
    pub fn has_number(&self) -> bool {
        matches!(self, AttributeValue::Integer(_) | AttributeValue::Number(_))
    }

    /// Numeric view of the value, widening integers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn has_label(&self) -> bool {
        matches!(self, AttributeValue::Text(_))
    }

    /// Text view of the value
    pub fn as_label(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for numeric vectors and for lists made only of numbers
    pub fn has_vector(&self) -> bool {
        match self {
            AttributeValue::Vector(_) => true,
            AttributeValue::List(items) => items.iter().all(AttributeValue::has_number),
            _ => false,
        }
    }

    /// Numeric vector view, converting all-number lists
    pub fn as_vector(&self) -> Option<Vec<f64>> {
        match self {
            AttributeValue::Vector(v) => Some(v.clone()),
            AttributeValue::List(items) => items.iter().map(AttributeValue::as_number).collect(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            AttributeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "Null",
            AttributeValue::Boolean(_) => "Boolean",
            AttributeValue::Integer(_) => "Integer",
            AttributeValue::Number(_) => "Number",
            AttributeValue::Text(_) => "Text",
            AttributeValue::Vector(_) => "Vector",
            AttributeValue::List(_) => "List",
            AttributeValue::Map(_) => "Map",
            AttributeValue::Bytes(_) => "Bytes",
        }
    }

    /// Convert a JSON value as produced by external readers.
    ///
    /// Arrays made only of numbers become vectors; integral numbers that fit
    /// in an `i64` stay integers.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                None => AttributeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => AttributeValue::Text(s.clone()),
            Value::Array(items) => {
                if !items.is_empty() && items.iter().all(Value::is_number) {
                    AttributeValue::Vector(items.iter().filter_map(Value::as_f64).collect())
                } else {
                    AttributeValue::List(items.iter().map(AttributeValue::from_json).collect())
                }
            }
            Value::Object(map) => AttributeValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON. Bytes become an array of numbers, non-finite
    /// numbers become null.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::Integer(i) => Value::from(*i),
            AttributeValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            AttributeValue::Text(s) => Value::String(s.clone()),
            AttributeValue::Vector(v) => Value::Array(
                v.iter()
                    .map(|n| AttributeValue::Number(*n).to_json())
                    .collect(),
            ),
            AttributeValue::List(items) => {
                Value::Array(items.iter().map(AttributeValue::to_json).collect())
            }
            AttributeValue::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            AttributeValue::Bytes(b) => Value::Array(b.iter().map(|x| Value::from(*x)).collect()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => write!(f, "\"{}\"", s),
            AttributeValue::Vector(v) => {
                write!(f, "(")?;
                for (i, val) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, ")")
            }
            AttributeValue::List(items) => {
                write!(f, "[")?;
                for (i, val) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            AttributeValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            AttributeValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

// Convenience conversions
impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(v: Vec<f64>) -> Self {
        AttributeValue::Vector(v)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(items: Vec<AttributeValue>) -> Self {
        AttributeValue::List(items)
    }
}

impl From<BTreeMap<String, AttributeValue>> for AttributeValue {
    fn from(map: BTreeMap<String, AttributeValue>) -> Self {
        AttributeValue::Map(map)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(b: Vec<u8>) -> Self {
        AttributeValue::Bytes(b)
    }
}

/// How many attributes an element may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributeMode {
    /// Any number of keys
    #[default]
    Map,
    /// One slot; storing any key evicts the previous one
    SingleSlot,
}

/// A single effective modification of an attribute bag
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeChange {
    Added {
        key: String,
        value: AttributeValue,
    },
    Changed {
        key: String,
        old_value: AttributeValue,
        new_value: AttributeValue,
    },
    Removed {
        key: String,
        old_value: AttributeValue,
    },
}

impl AttributeChange {
    pub fn key(&self) -> &str {
        match self {
            AttributeChange::Added { key, .. }
            | AttributeChange::Changed { key, .. }
            | AttributeChange::Removed { key, .. } => key,
        }
    }
}

/// Key/value attribute bag of one element
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    mode: AttributeMode,
    entries: FxHashMap<String, AttributeValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: AttributeMode) -> Self {
        Attributes {
            mode,
            entries: FxHashMap::default(),
        }
    }

    pub fn mode(&self) -> AttributeMode {
        self.mode
    }

    /// Switch the storage mode. Going to single-slot keeps an arbitrary
    /// entry and drops the rest without reporting them.
    pub(crate) fn set_mode(&mut self, mode: AttributeMode) {
        self.mode = mode;
        if mode == AttributeMode::SingleSlot && self.entries.len() > 1 {
            if let Some(key) = self.entries.keys().next().cloned() {
                self.entries.retain(|k, _| *k == key);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Numeric attribute, if present and numeric
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AttributeValue::as_number)
    }

    /// Text attribute, if present and textual
    pub fn label(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_label)
    }

    /// Vector attribute, if present and convertible
    pub fn vector(&self, key: &str) -> Option<Vec<f64>> {
        self.get(key).and_then(AttributeValue::as_vector)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Store a value, returning what effectively changed.
    ///
    /// Storing a value equal to the current one changes nothing.
    pub fn set(&mut self, key: impl Into<String>, value: AttributeValue) -> Vec<AttributeChange> {
        let key = key.into();
        let mut changes = Vec::with_capacity(1);

        if self.mode == AttributeMode::SingleSlot {
            let evicted: Vec<String> = self.entries.keys().filter(|k| **k != key).cloned().collect();
            for old_key in evicted {
                if let Some(old_value) = self.entries.remove(&old_key) {
                    changes.push(AttributeChange::Removed {
                        key: old_key,
                        old_value,
                    });
                }
            }
        }

        match self.entries.get_mut(&key) {
            Some(current) if *current == value => {}
            Some(current) => {
                let old_value = std::mem::replace(current, value.clone());
                changes.push(AttributeChange::Changed {
                    key,
                    old_value,
                    new_value: value,
                });
            }
            None => {
                self.entries.insert(key.clone(), value.clone());
                changes.push(AttributeChange::Added { key, value });
            }
        }
        changes
    }

    /// Remove a key, returning the change if it was present
    pub fn remove(&mut self, key: &str) -> Option<AttributeChange> {
        self.entries
            .remove_entry(key)
            .map(|(key, old_value)| AttributeChange::Removed { key, old_value })
    }

    /// Drop everything without reporting
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_types() {
        assert_eq!(AttributeValue::Text("x".to_string()).type_name(), "Text");
        assert_eq!(AttributeValue::Integer(42).type_name(), "Integer");
        assert_eq!(AttributeValue::Number(3.5).type_name(), "Number");
        assert_eq!(AttributeValue::Boolean(true).type_name(), "Boolean");
        assert_eq!(AttributeValue::Vector(vec![]).type_name(), "Vector");
        assert_eq!(AttributeValue::Map(BTreeMap::new()).type_name(), "Map");
        assert_eq!(AttributeValue::Bytes(vec![1]).type_name(), "Bytes");
        assert_eq!(AttributeValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_numeric_queries() {
        let int: AttributeValue = 4i64.into();
        assert!(int.has_number());
        assert_eq!(int.as_number(), Some(4.0));
        assert_eq!(int.as_integer(), Some(4));

        let text: AttributeValue = "label".into();
        assert!(!text.has_number());
        assert!(text.has_label());
        assert_eq!(text.as_label(), Some("label"));
    }

    #[test]
    fn test_vector_queries() {
        let v: AttributeValue = vec![1.0, 2.0].into();
        assert!(v.has_vector());
        assert_eq!(v.as_vector(), Some(vec![1.0, 2.0]));

        let list = AttributeValue::List(vec![1i64.into(), 2.5.into()]);
        assert!(list.has_vector());
        assert_eq!(list.as_vector(), Some(vec![1.0, 2.5]));

        let mixed = AttributeValue::List(vec![1i64.into(), "a".into()]);
        assert!(!mixed.has_vector());
        assert_eq!(mixed.as_vector(), None);
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({
            "name": "a",
            "xy": [1.0, 2.0],
            "weight": 3,
            "tags": ["x", 1],
        });
        let value = AttributeValue::from_json(&json);
        let map = value.as_map().unwrap();
        assert_eq!(map["name"].as_label(), Some("a"));
        assert_eq!(map["xy"], AttributeValue::Vector(vec![1.0, 2.0]));
        assert_eq!(map["weight"].as_integer(), Some(3));
        assert_eq!(map["tags"].as_list().unwrap().len(), 2);

        assert_eq!(AttributeValue::Number(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(AttributeValue::Integer(7).to_json(), serde_json::json!(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::Vector(vec![1.0, 2.5]).to_string(), "(1, 2.5)");
        assert_eq!(AttributeValue::Text("a".into()).to_string(), "\"a\"");
        assert_eq!(AttributeValue::Bytes(vec![0, 1, 2]).to_string(), "<3 bytes>");
    }

    #[test]
    fn test_set_reports_added_then_changed() {
        let mut attrs = Attributes::new();
        let changes = attrs.set("size", 1i64.into());
        assert_eq!(
            changes,
            vec![AttributeChange::Added {
                key: "size".into(),
                value: 1i64.into()
            }]
        );

        let changes = attrs.set("size", 2i64.into());
        assert_eq!(
            changes,
            vec![AttributeChange::Changed {
                key: "size".into(),
                old_value: 1i64.into(),
                new_value: 2i64.into()
            }]
        );
        assert_eq!(attrs.number("size"), Some(2.0));
    }

    #[test]
    fn test_set_same_value_is_silent() {
        let mut attrs = Attributes::new();
        attrs.set("ui.label", "A".into());
        assert!(attrs.set("ui.label", "A".into()).is_empty());
        assert_eq!(attrs.label("ui.label"), Some("A"));
    }

    #[test]
    fn test_remove() {
        let mut attrs = Attributes::new();
        attrs.set("k", true.into());
        let change = attrs.remove("k").unwrap();
        assert_eq!(change.key(), "k");
        assert!(attrs.remove("k").is_none());
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_single_slot_evicts_previous_key() {
        let mut attrs = Attributes::with_mode(AttributeMode::SingleSlot);
        attrs.set("a", 1i64.into());
        let changes = attrs.set("b", 2i64.into());

        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], AttributeChange::Removed { key, .. } if key == "a"));
        assert!(matches!(&changes[1], AttributeChange::Added { key, .. } if key == "b"));
        assert_eq!(attrs.len(), 1);
        assert!(!attrs.contains("a"));
    }

    #[test]
    fn test_single_slot_same_key_changes_in_place() {
        let mut attrs = Attributes::with_mode(AttributeMode::SingleSlot);
        attrs.set("a", 1i64.into());
        let changes = attrs.set("a", 2i64.into());
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], AttributeChange::Changed { .. }));
    }

    #[test]
    fn test_switch_to_single_slot_keeps_one_entry() {
        let mut attrs = Attributes::new();
        attrs.set("a", 1i64.into());
        attrs.set("b", 2i64.into());
        attrs.set_mode(AttributeMode::SingleSlot);
        assert_eq!(attrs.len(), 1);
    }
}
