//! Dynamic value representation for GLYPH data.
//!
//! This module provides the [`Value`] enum, the universal tagged union every
//! other part of the crate operates on. A `Value` is built by the parser, by
//! [`to_value`](crate::to_value), by the [`glyph!`](crate::glyph) macro, or by
//! hand; the canonicalizer turns it into exactly one text string.
//!
//! ## Core Types
//!
//! - [`Value`]: any GLYPH value (null, bool, int, float, string, bytes,
//!   timestamp, reference id, list, map, struct, sum)
//! - [`GlyphMap`](crate::GlyphMap): the insertion-ordered map used by the
//!   `Map` and `Struct` variants
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use glyph::{glyph, Value};
//!
//! let null = Value::Null;
//! let flag = Value::from(true);
//! let count = Value::from(42);
//! let name = Value::from("hello");
//!
//! let obj = glyph!({
//!     "name": "Alice",
//!     "age": 30
//! });
//! assert!(obj.is_map());
//! ```
//!
//! ### Loose equality
//!
//! Two values are *loosely equal* iff their canonical strings are
//! byte-identical. This conflates, for example, `Float(-0.0)` and `Int(0)`:
//!
//! ```rust
//! use glyph::Value;
//!
//! assert!(Value::Float(-0.0).loosely_eq(&Value::Int(0)));
//! assert!(!Value::Float(1.5).loosely_eq(&Value::Int(1)));
//! ```

use crate::GlyphMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A dynamically-typed representation of any valid GLYPH value.
///
/// The variant set is closed and enumerable; all dispatch in this crate is
/// exhaustive matching over it.
///
/// # Examples
///
/// ```rust
/// use glyph::Value;
///
/// let num = Value::Int(42);
/// let text = Value::Str("hello".to_string());
///
/// assert!(num.is_int());
/// assert!(text.is_str());
/// assert_eq!(num.as_i64(), Some(42));
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    /// A typed reference: emitted as `^prefix:value`.
    Id {
        prefix: String,
        value: String,
    },
    List(Vec<Value>),
    Map(GlyphMap),
    /// A named record: like `Map` but carrying a nominal type tag.
    Struct {
        name: String,
        fields: GlyphMap,
    },
    /// A tagged union value, e.g. `Some(42)` or `None()`.
    Sum {
        tag: String,
        value: Option<Box<Value>>,
    },
}

impl Value {
    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if the value is a boolean.
    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns `true` if the value is an integer.
    #[inline]
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// Returns `true` if the value is a float.
    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Returns `true` if the value is a string.
    #[inline]
    #[must_use]
    pub const fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Returns `true` if the value is a byte blob.
    #[inline]
    #[must_use]
    pub const fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    /// Returns `true` if the value is a timestamp.
    #[inline]
    #[must_use]
    pub const fn is_time(&self) -> bool {
        matches!(self, Value::Time(_))
    }

    /// Returns `true` if the value is a reference id.
    #[inline]
    #[must_use]
    pub const fn is_id(&self) -> bool {
        matches!(self, Value::Id { .. })
    }

    /// Returns `true` if the value is a list.
    #[inline]
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Returns `true` if the value is a map.
    #[inline]
    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns `true` if the value is a named struct.
    #[inline]
    #[must_use]
    pub const fn is_struct(&self) -> bool {
        matches!(self, Value::Struct { .. })
    }

    /// Returns `true` if the value is a tagged sum.
    #[inline]
    #[must_use]
    pub const fn is_sum(&self) -> bool {
        matches!(self, Value::Sum { .. })
    }

    /// If the value is a boolean, returns it. Otherwise returns `None`.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is an integer, returns it. Otherwise returns `None`.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// If the value is a float or an integer, returns it as `f64`.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// If the value is a string, returns a reference to it.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// If the value is a byte blob, returns a reference to it.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// If the value is a timestamp, returns a reference to it.
    #[inline]
    #[must_use]
    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    /// If the value is a list, returns a reference to it.
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// If the value is a map, returns a reference to it.
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&GlyphMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// If the value is a map or a struct, returns its field map.
    #[inline]
    #[must_use]
    pub fn as_fields(&self) -> Option<&GlyphMap> {
        match self {
            Value::Map(map) => Some(map),
            Value::Struct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Builds a reference id value.
    #[must_use]
    pub fn id(prefix: impl Into<String>, value: impl Into<String>) -> Self {
        Value::Id {
            prefix: prefix.into(),
            value: value.into(),
        }
    }

    /// Builds a sum value with a payload.
    #[must_use]
    pub fn sum(tag: impl Into<String>, value: Value) -> Self {
        Value::Sum {
            tag: tag.into(),
            value: Some(Box::new(value)),
        }
    }

    /// Builds a sum value without a payload.
    #[must_use]
    pub fn sum_unit(tag: impl Into<String>) -> Self {
        Value::Sum {
            tag: tag.into(),
            value: None,
        }
    }

    /// Returns `true` iff `self` and `other` canonicalize to the same text.
    ///
    /// This is the format's equality: structural equality up to map key order
    /// and numeric normalization.
    #[must_use]
    pub fn loosely_eq(&self, other: &Value) -> bool {
        crate::canonicalize(self) == crate::canonicalize(other)
    }
}

impl fmt::Display for Value {
    /// Informal display; use [`canonicalize`](crate::canonicalize) for the
    /// canonical text form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::canonicalize(self))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<GlyphMap> for Value {
    fn from(value: GlyphMap) -> Self {
        Value::Map(value)
    }
}

impl TryFrom<Value> for i64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            _ => Err(crate::Error::Message(format!(
                "expected integer, found {:?}",
                value
            ))),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Int(i) => Ok(i as f64),
            Value::Float(f) => Ok(f),
            _ => Err(crate::Error::Message(format!(
                "expected number, found {:?}",
                value
            ))),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            _ => Err(crate::Error::Message(format!(
                "expected bool, found {:?}",
                value
            ))),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            _ => Err(crate::Error::Message(format!(
                "expected string, found {:?}",
                value
            ))),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Time(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::Id { prefix, value } => {
                serializer.serialize_str(&format!("^{}:{}", prefix, value))
            }
            Value::List(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                use serde::ser::SerializeMap;
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    ser.serialize_entry(k, v)?;
                }
                ser.end()
            }
            // The nominal type tag does not survive the serde bridge; structs
            // cross as plain maps.
            Value::Struct { fields, .. } => {
                use serde::ser::SerializeMap;
                let mut ser = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    ser.serialize_entry(k, v)?;
                }
                ser.end()
            }
            Value::Sum { tag, value } => match value {
                Some(inner) => {
                    use serde::ser::SerializeMap;
                    let mut ser = serializer.serialize_map(Some(1))?;
                    ser.serialize_entry(tag, inner.as_ref())?;
                    ser.end()
                }
                None => serializer.serialize_str(tag),
            },
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid GLYPH value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Value::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                if value <= i64::MAX as u64 {
                    Ok(Value::Int(value as i64))
                } else {
                    Ok(Value::Float(value as f64))
                }
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Value::Float(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Value::Str(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(Value::Str(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::List(items))
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut map = GlyphMap::new();
                while let Some((key, value)) = access.next_entry()? {
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42i64), Value::Int(42));
        assert_eq!(Value::from(3.5f64), Value::Float(3.5));
        assert_eq!(Value::from("test"), Value::Str("test".to_string()));
        assert_eq!(Value::from(vec![1u8, 2, 3]), Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn test_accessors() {
        let v = Value::Int(7);
        assert!(v.is_int());
        assert_eq!(v.as_i64(), Some(7));
        assert_eq!(v.as_f64(), Some(7.0));
        assert_eq!(v.as_str(), None);

        let id = Value::id("user", "42");
        assert!(id.is_id());

        let sum = Value::sum("Some", Value::Int(1));
        assert!(sum.is_sum());
        assert!(Value::sum_unit("None").is_sum());
    }

    #[test]
    fn test_tryfrom() {
        assert_eq!(i64::try_from(Value::Int(42)).unwrap(), 42);
        assert!(i64::try_from(Value::Str("x".into())).is_err());
        assert_eq!(f64::try_from(Value::Int(2)).unwrap(), 2.0);
        assert_eq!(f64::try_from(Value::Float(2.5)).unwrap(), 2.5);
        assert!(bool::try_from(Value::Int(1)).is_err());
        assert_eq!(String::try_from(Value::Str("hi".into())).unwrap(), "hi");
    }

    #[test]
    fn test_as_fields_covers_map_and_struct() {
        let mut fields = GlyphMap::new();
        fields.insert("x".to_string(), Value::Int(1));

        let map = Value::Map(fields.clone());
        let st = Value::Struct {
            name: "Point".to_string(),
            fields,
        };
        assert_eq!(map.as_fields().unwrap().len(), 1);
        assert_eq!(st.as_fields().unwrap().len(), 1);
        assert!(Value::Null.as_fields().is_none());
    }

    #[test]
    fn test_serde_bridge_via_json() {
        let mut map = GlyphMap::new();
        map.insert("a".to_string(), Value::Int(2));
        map.insert("b".to_string(), Value::List(vec![Value::Bool(true)]));
        let value = Value::Map(map);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"a":2,"b":[true]}"#);

        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
