//! Streaming serde deserializer.
//!
//! [`Deserializer`] feeds serde visitors straight from a [`Reader`], token by
//! token. Strings are handed out as transient `&str`, so types that borrow
//! from the input (`&'de str`) are not supported; owned types are.
//!
//! Structs accept both the object form and the positional array form, the
//! same two encodings object descriptions understand. Enums use the
//! externally tagged representation.
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let a: Point = jsonbind::from_str(r#"{"x": 1, "y": 2, "extra": [true]}"#).unwrap();
//! let b: Point = jsonbind::from_str("[1, 2]").unwrap();
//! assert_eq!(a, b);
//! ```

use crate::decimal::DECIMAL_TOKEN;
use crate::error::{Error, Result};
use crate::number::{self, Number, NumberKind};
use crate::reader::Reader;
use serde::de::value::StrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};

/// Serde deserializer reading from a [`Reader`].
///
/// The reader must already be on the value's first byte (see
/// [`Reader::advance`]); afterwards it rests on the value's last byte.
pub struct Deserializer<'a, 'r> {
    reader: &'a mut Reader<'r>,
}

impl<'a, 'r> Deserializer<'a, 'r> {
    pub fn new(reader: &'a mut Reader<'r>) -> Self {
        Deserializer { reader }
    }
}

/// Deserializes one document from a reader positioned before it, rejecting
/// trailing content.
pub(crate) fn from_document<T: DeserializeOwned>(reader: &mut Reader<'_>) -> Result<T> {
    reader.advance()?;
    let value = T::deserialize(&mut Deserializer::new(reader))?;
    reader.finish()?;
    Ok(value)
}

macro_rules! deserialize_int {
    ($($method:ident => $visit:ident: $t:ty),*) => {
        $(fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
            visitor.$visit(self.reader.read_int::<$t>()?)
        })*
    };
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'_, '_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.reader.last() {
            b'"' => visitor.visit_str(self.reader.read_str()?),
            b'[' => self.deserialize_seq(visitor),
            b'{' => self.deserialize_map(visitor),
            b't' | b'f' => visitor.visit_bool(self.reader.read_bool()?),
            b'n' => {
                self.reader.was_null()?;
                visitor.visit_unit()
            }
            b'-' | b'0'..=b'9' => match self.reader.read_number(NumberKind::Any)? {
                Number::Integer(v) => visitor.visit_i64(v),
                Number::Float(v) => visitor.visit_f64(v),
                Number::Decimal(d) => {
                    if d.scale() == 0 {
                        if let Ok(v) = u64::try_from(d.unscaled()) {
                            return visitor.visit_u64(v);
                        }
                    }
                    visitor.visit_f64(d.to_f64())
                }
            },
            _ => Err(self.reader.unexpected("value")),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(self.reader.read_bool()?)
    }

    deserialize_int!(
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64
    );

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.reader.read_f32()?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.reader.read_f64()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.reader.read_str()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => visitor.visit_str(s),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_str(self.reader.read_str()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.reader.last() == b'[' {
            return self.deserialize_seq(visitor);
        }
        visitor.visit_byte_buf(self.reader.read_base64()?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.reader.was_null()? {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.reader.was_null()? {
            visitor.visit_unit()
        } else {
            Err(self.reader.unexpected("null"))
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        if name == DECIMAL_TOKEN {
            let decimal = self.reader.read_decimal()?;
            return visitor.visit_str(&decimal.to_string());
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.reader.check(b'[')?;
        self.reader.enter()?;
        let mut access = Elements {
            de: &mut *self,
            first: true,
            done: false,
        };
        let value = visitor.visit_seq(&mut access)?;
        if !access.done && self.reader.advance()? != b']' {
            return Err(self.reader.unexpected("']'"));
        }
        self.reader.leave();
        Ok(value)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.reader.check(b'{')?;
        self.reader.enter()?;
        let mut access = Entries {
            de: &mut *self,
            first: true,
            done: false,
        };
        let value = visitor.visit_map(&mut access)?;
        if !access.done {
            // The visitor stopped early; drain what it did not ask for.
            loop {
                match self.reader.advance()? {
                    b'}' => break,
                    b',' => {
                        self.reader.advance()?;
                        self.reader.fill_name()?;
                        self.reader.advance()?;
                        self.reader.skip_value()?;
                    }
                    _ => return Err(self.reader.unexpected("',' or '}'")),
                }
            }
        }
        self.reader.leave();
        Ok(value)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.reader.last() {
            b'[' => self.deserialize_seq(visitor),
            b'{' => self.deserialize_map(visitor),
            _ => Err(self.reader.unexpected("'{' or '['")),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.reader.last() {
            b'"' => {
                let variant: StrDeserializer<'_, Error> = self.reader.read_str()?.into_deserializer();
                visitor.visit_enum(variant)
            }
            b'{' => {
                self.reader.enter()?;
                self.reader.expect(b'"')?;
                let value = visitor.visit_enum(Variant { de: &mut *self })?;
                self.reader.expect(b'}')?;
                self.reader.leave();
                Ok(value)
            }
            _ => Err(self.reader.unexpected("enum variant")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.reader.skip_value()?;
        visitor.visit_unit()
    }
}

struct Elements<'s, 'a, 'r> {
    de: &'s mut Deserializer<'a, 'r>,
    first: bool,
    done: bool,
}

impl<'de> de::SeqAccess<'de> for Elements<'_, '_, '_> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.done {
            return Ok(None);
        }
        let reader = &mut *self.de.reader;
        let b = reader.advance()?;
        if self.first {
            self.first = false;
            if b == b']' {
                self.done = true;
                return Ok(None);
            }
        } else {
            match b {
                b',' => {
                    reader.advance()?;
                }
                b']' => {
                    self.done = true;
                    return Ok(None);
                }
                _ => return Err(reader.unexpected("',' or ']'")),
            }
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

struct Entries<'s, 'a, 'r> {
    de: &'s mut Deserializer<'a, 'r>,
    first: bool,
    done: bool,
}

impl<'de> de::MapAccess<'de> for Entries<'_, '_, '_> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.done {
            return Ok(None);
        }
        let reader = &mut *self.de.reader;
        let b = reader.advance()?;
        if self.first {
            self.first = false;
            if b == b'}' {
                self.done = true;
                return Ok(None);
            }
        } else {
            match b {
                b',' => {
                    reader.advance()?;
                }
                b'}' => {
                    self.done = true;
                    return Ok(None);
                }
                _ => return Err(reader.unexpected("',' or '}'")),
            }
        }
        let key = seed.deserialize(MapKey {
            reader: &mut *self.de.reader,
        })?;
        self.de.reader.expect(b':')?;
        Ok(Some(key))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        self.de.reader.advance()?;
        seed.deserialize(&mut *self.de)
    }
}

struct Variant<'s, 'a, 'r> {
    de: &'s mut Deserializer<'a, 'r>,
}

impl<'de, 's, 'a, 'r> de::EnumAccess<'de> for Variant<'s, 'a, 'r> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self)> {
        let variant = seed.deserialize(MapKey {
            reader: &mut *self.de.reader,
        })?;
        self.de.reader.expect(b':')?;
        self.de.reader.advance()?;
        Ok((variant, self))
    }
}

impl<'de> de::VariantAccess<'de> for Variant<'_, '_, '_> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        if self.de.reader.was_null()? {
            Ok(())
        } else {
            Err(self.de.reader.unexpected("null"))
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_struct(&mut *self.de, "", &[], visitor)
    }
}

/// Object keys: always strings on the wire, parsed into scalar key types on
/// request.
struct MapKey<'a, 'r> {
    reader: &'a mut Reader<'r>,
}

impl MapKey<'_, '_> {
    fn text(&mut self) -> Result<&str> {
        if self.reader.last() != b'"' {
            return Err(self.reader.unexpected("object key"));
        }
        self.reader.read_str()
    }

    fn key_offset(&self) -> u64 {
        self.reader.position()
    }
}

macro_rules! deserialize_int_key {
    ($($method:ident => $visit:ident: $t:ty),*) => {
        $(fn $method<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
            let at = self.key_offset();
            let text = self.text()?;
            visitor.$visit(number::parse_int_at::<$t>(text.as_bytes(), at)?)
        })*
    };
}

impl<'de> de::Deserializer<'de> for MapKey<'_, '_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        visitor.visit_str(self.text()?)
    }

    deserialize_int_key!(
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64
    );

    fn deserialize_bool<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        let at = self.key_offset();
        match self.text()? {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            other => Err(Error::InvalidToken {
                offset: at,
                expected: "boolean key".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        mut self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let variant: StrDeserializer<'_, Error> = self.text()?.into_deserializer();
        visitor.visit_enum(variant)
    }

    serde::forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}
