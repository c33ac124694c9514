//! Dynamic values
//!
//! [`Value`] is the tagged union stored in every record slot. Values own
//! their contents: cloning a value (including nested lists, maps and records)
//! yields an independent copy.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{StructError, StructResult};
use crate::record::Record;
use crate::ty::{Kind, ValueType};

/// Key of a map value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// String key
    String(String),
    /// Integer key
    Int(i64),
    /// Boolean key
    Bool(bool),
}

impl MapKey {
    /// Whether this key fits a map declared with `key_type`
    pub fn conforms_to(&self, key_type: &ValueType) -> bool {
        matches!(
            (self, key_type),
            (MapKey::String(_), ValueType::String)
                | (MapKey::Int(_), ValueType::Int)
                | (MapKey::Bool(_), ValueType::Bool)
        )
    }

    /// Parse the textual form of a key for `key_type`
    pub fn parse(text: &str, key_type: &ValueType) -> Option<Self> {
        match key_type {
            ValueType::String => Some(MapKey::String(text.to_string())),
            ValueType::Int => text.parse().ok().map(MapKey::Int),
            ValueType::Bool => text.parse().ok().map(MapKey::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::String(s) => write!(f, "{}", s),
            MapKey::Int(i) => write!(f, "{}", i),
            MapKey::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(s.to_string())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::String(s)
    }
}

impl From<i64> for MapKey {
    fn from(i: i64) -> Self {
        MapKey::Int(i)
    }
}

impl From<bool> for MapKey {
    fn from(b: bool) -> Self {
        MapKey::Bool(b)
    }
}

/// A dynamically typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// List of values sharing one element type
    List(Vec<Value>),
    /// Ordered map
    Map(BTreeMap<MapKey, Value>),
    /// Present or absent indirection
    Optional(Option<Box<Value>>),
    /// Nested record
    Record(Record),
}

impl Value {
    /// Zero value of `ty`
    pub fn zero(ty: &ValueType) -> Self {
        match ty {
            ValueType::String => Value::String(String::new()),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Bool => Value::Bool(false),
            ValueType::List(_) => Value::List(Vec::new()),
            ValueType::Map(..) => Value::Map(BTreeMap::new()),
            ValueType::Optional(_) => Value::Optional(None),
            ValueType::Record(record_ty) => Value::Record(Record::zero(record_ty.clone())),
        }
    }

    /// Present optional holding `value`
    pub fn some(value: impl Into<Value>) -> Self {
        Value::Optional(Some(Box::new(value.into())))
    }

    /// Absent optional
    pub fn none() -> Self {
        Value::Optional(None)
    }

    /// Kind of this value
    pub fn kind(&self) -> Kind {
        match self {
            Value::String(_) => Kind::String,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Bool(_) => Kind::Bool,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Optional(_) => Kind::Optional,
            Value::Record(_) => Kind::Record,
        }
    }

    /// Whether this value is a valid inhabitant of `ty`
    pub fn conforms_to(&self, ty: &ValueType) -> bool {
        match (self, ty) {
            (Value::String(_), ValueType::String)
            | (Value::Int(_), ValueType::Int)
            | (Value::Float(_), ValueType::Float)
            | (Value::Bool(_), ValueType::Bool) => true,
            (Value::List(items), ValueType::List(elem)) => {
                items.iter().all(|item| item.conforms_to(elem))
            }
            (Value::Map(entries), ValueType::Map(key, value)) => entries
                .iter()
                .all(|(k, v)| k.conforms_to(key) && v.conforms_to(value)),
            (Value::Optional(None), ValueType::Optional(_)) => true,
            (Value::Optional(Some(inner)), ValueType::Optional(inner_ty)) => {
                inner.conforms_to(inner_ty)
            }
            (Value::Record(record), ValueType::Record(record_ty)) => {
                record.record_type().as_ref() == record_ty.as_ref()
            }
            _ => false,
        }
    }

    /// Strip one level of optional indirection
    ///
    /// Returns `None` for an absent optional.
    pub fn deref_once(&self) -> Option<&Value> {
        match self {
            Value::Optional(inner) => inner.as_deref(),
            other => Some(other),
        }
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer contents
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float contents
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean contents
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List contents
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map contents
    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Nested record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Mutable nested record
    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Value::List(items) => match items.first() {
                Some(first) => format!("list<{}>", first.describe()),
                None => "list".to_string(),
            },
            Value::Optional(Some(inner)) => format!("optional<{}>", inner.describe()),
            Value::Record(record) => record.record_type().to_string(),
            other => other.kind().to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<MapKey>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(entries: BTreeMap<K, V>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        Value::Optional(value.map(|v| Box::new(v.into())))
    }
}

/// Extract a Rust value from a [`Value`]
pub trait FromValue: Sized {
    /// Convert, failing with a type mismatch that names `field`
    fn from_value(value: &Value, field: &str) -> StructResult<Self>;
}

fn mismatch(field: &str, expected: &str, value: &Value) -> StructError {
    StructError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: value.describe(),
    }
}

impl FromValue for Value {
    fn from_value(value: &Value, _field: &str) -> StructResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value, field: &str) -> StructResult<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(field, "string", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value, field: &str) -> StructResult<Self> {
        value.as_int().ok_or_else(|| mismatch(field, "int", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value, field: &str) -> StructResult<Self> {
        value.as_float().ok_or_else(|| mismatch(field, "float", value))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, field: &str) -> StructResult<Self> {
        value.as_bool().ok_or_else(|| mismatch(field, "bool", value))
    }
}

impl FromValue for Record {
    fn from_value(value: &Value, field: &str) -> StructResult<Self> {
        value
            .as_record()
            .cloned()
            .ok_or_else(|| mismatch(field, "record", value))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value, field: &str) -> StructResult<Self> {
        value
            .as_list()
            .ok_or_else(|| mismatch(field, "list", value))?
            .iter()
            .map(|item| T::from_value(item, field))
            .collect()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, field: &str) -> StructResult<Self> {
        match value {
            Value::Optional(None) => Ok(None),
            Value::Optional(Some(inner)) => T::from_value(inner, field).map(Some),
            other => Err(mismatch(field, "optional", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero(&ValueType::String), Value::String(String::new()));
        assert_eq!(Value::zero(&ValueType::Int), Value::Int(0));
        assert_eq!(Value::zero(&ValueType::Float), Value::Float(0.0));
        assert_eq!(Value::zero(&ValueType::Bool), Value::Bool(false));
        assert_eq!(
            Value::zero(&ValueType::list(ValueType::Int)),
            Value::List(vec![])
        );
        assert_eq!(
            Value::zero(&ValueType::optional(ValueType::Int)),
            Value::none()
        );
    }

    #[test]
    fn test_conforms_to_nested() {
        let ty = ValueType::map(ValueType::String, ValueType::list(ValueType::Int)).unwrap();
        let mut entries = BTreeMap::new();
        entries.insert("a", vec![1i64, 2, 3]);
        let value = Value::from(entries);
        assert!(value.conforms_to(&ty));

        let mut wrong = BTreeMap::new();
        wrong.insert(1i64, vec![1i64]);
        assert!(!Value::from(wrong).conforms_to(&ty));

        let mixed = Value::List(vec![Value::Int(1), Value::from("x")]);
        assert!(!mixed.conforms_to(&ValueType::list(ValueType::Int)));
    }

    #[test]
    fn test_optional_conformance() {
        let ty = ValueType::optional(ValueType::Int);
        assert!(Value::none().conforms_to(&ty));
        assert!(Value::some(3i64).conforms_to(&ty));
        assert!(!Value::some("x").conforms_to(&ty));
        assert!(!Value::Int(3).conforms_to(&ty));
    }

    #[test]
    fn test_deref_single_level() {
        assert_eq!(Value::some(1i64).deref_once(), Some(&Value::Int(1)));
        assert_eq!(Value::none().deref_once(), None);
        let nested = Value::some(Value::some(1i64));
        assert_eq!(nested.deref_once(), Some(&Value::some(1i64)));
    }

    #[test]
    fn test_map_key_parse() {
        assert_eq!(MapKey::parse("42", &ValueType::Int), Some(MapKey::Int(42)));
        assert_eq!(MapKey::parse("x", &ValueType::Int), None);
        assert_eq!(
            MapKey::parse("true", &ValueType::Bool),
            Some(MapKey::Bool(true))
        );
        assert_eq!(MapKey::parse("1.5", &ValueType::Float), None);
    }

    #[test]
    fn test_from_value() {
        assert_eq!(String::from_value(&Value::from("a"), "f").unwrap(), "a");
        assert_eq!(
            Vec::<i64>::from_value(&Value::from(vec![1i64, 2]), "f").unwrap(),
            vec![1, 2]
        );
        assert_eq!(
            Option::<bool>::from_value(&Value::none(), "f").unwrap(),
            None
        );
        let err = i64::from_value(&Value::from("a"), "Age").unwrap_err();
        assert!(matches!(err, StructError::TypeMismatch { ref field, .. } if field == "Age"));
    }
}
