//! Dynamically typed JSON values.
//!
//! [`Value`] holds any JSON document whose shape is not known up front. It
//! is the built-in binding for untyped data: the registry reads and writes
//! it directly off the token stream, and numbers keep their exact form
//! (`i64` when the text is a plain integer that fits, an exact
//! [`Decimal`] otherwise).
//!
//! ```rust
//! use jsonbind::{json, Engine, Value};
//!
//! let engine = Engine::new();
//! let json = br#"{"id":7,"price":19.90,"tags":["a"]}"#;
//! let value: Value = engine.deserialize_bytes(json, json.len()).unwrap();
//! assert_eq!(value.get("id").and_then(Value::as_i64), Some(7));
//! assert_eq!(value.get("price").unwrap().to_string(), "19.90");
//! assert_eq!(value, json!({"id": 7, "price": (value["price"].clone()), "tags": ["a"]}));
//! ```

use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::map::JsonMap;
use crate::number::{Number, NumberKind};
use crate::options::{NonFinitePolicy, Options};
use crate::reader::Reader;
use crate::writer::Writer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Index;

/// Any JSON value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(JsonMap),
}

impl Value {
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&JsonMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Member `key` of an object; `None` for missing keys and non-objects.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }
}

static NULL: Value = Value::Null;

impl Index<&str> for Value {
    type Output = Value;

    /// Returns `Null` for missing keys and non-objects.
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.as_array().and_then(|items| items.get(index)).unwrap_or(&NULL)
    }
}

/// Reads any value at the current token.
pub(crate) fn read_value(reader: &mut Reader<'_>) -> Result<Value> {
    match reader.last() {
        b'"' => reader.read_string().map(Value::String),
        b'{' => read_map(reader).map(Value::Object),
        b'[' => {
            let mut items = Vec::new();
            reader.read_array(|r| {
                items.push(read_value(r)?);
                Ok(())
            })?;
            Ok(Value::Array(items))
        }
        b't' | b'f' => reader.read_bool().map(Value::Bool),
        b'n' => {
            reader.was_null()?;
            Ok(Value::Null)
        }
        b'-' | b'0'..=b'9' => reader.read_number(NumberKind::Any).map(Value::Number),
        _ => Err(reader.unexpected("value")),
    }
}

pub(crate) fn read_map(reader: &mut Reader<'_>) -> Result<JsonMap> {
    let mut map = JsonMap::new();
    reader.read_object(|r, key| {
        let value = read_value(r)?;
        map.insert(key, value);
        Ok(())
    })?;
    Ok(map)
}

pub(crate) fn write_value(writer: &mut Writer<'_>, value: &Value) -> Result<()> {
    match value {
        Value::Null => writer.write_null(),
        Value::Bool(b) => writer.write_bool(*b),
        Value::Number(n) => writer.write_number(n)?,
        Value::String(s) => writer.write_string(s),
        Value::Array(items) => {
            writer.write_byte(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    writer.write_byte(b',');
                }
                write_value(writer, item)?;
            }
            writer.write_byte(b']');
        }
        Value::Object(map) => write_map(writer, map)?,
    }
    Ok(())
}

pub(crate) fn write_map(writer: &mut Writer<'_>, map: &JsonMap) -> Result<()> {
    writer.write_byte(b'{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            writer.write_byte(b',');
        }
        writer.write_key(key);
        write_value(writer, value)?;
    }
    writer.write_byte(b'}');
    Ok(())
}

/// Compact JSON text. Non-finite floats render as quoted names.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = Options::new().with_non_finite(NonFinitePolicy::Quoted);
        let mut writer = Writer::with_options(&options);
        write_value(&mut writer, self).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(writer.as_bytes()))
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Integer(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Value::Number(Number::Decimal(d)) => d.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("any JSON value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::Number(Number::Integer(value)))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::Number(match i64::try_from(value) {
                    Ok(v) => Number::Integer(v),
                    Err(_) => Number::Decimal(Decimal::from(value)),
                }))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Number(Number::Float(value)))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::String(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = JsonMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Value::Object(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::custom(format!("expected integer, found {value}")))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::custom(format!("expected number, found {value}")))
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::custom(format!("expected bool, found {value}")))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(Error::custom(format!("expected string, found {other}"))),
        }
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::Number(Number::Integer(i64::from(value)))
            }
        })*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(match i64::try_from(value) {
            Ok(v) => Number::Integer(v),
            Err(_) => Number::Decimal(Decimal::from(value)),
        })
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(Number::Float(f64::from(value)))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::Float(value))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(Number::Decimal(value))
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<JsonMap> for Value {
    fn from(value: JsonMap) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
