//! Streaming serde serializer.
//!
//! [`Serializer`] drives any `serde::Serialize` type straight into a
//! [`Writer`]: no intermediate tree is built and nothing is buffered beyond
//! the writer itself. The output is compact JSON.
//!
//! Enums use the externally tagged representation: unit variants become
//! strings, other variants become a single-key object. Map keys must
//! serialize as strings, integers, chars or bools; non-string keys are
//! written quoted.
//!
//! ```rust
//! use jsonbind::{ser::Serializer, Writer};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! enum Shape {
//!     Circle { r: f64 },
//!     Empty,
//! }
//!
//! let mut writer = Writer::new();
//! vec![Shape::Circle { r: 1.5 }, Shape::Empty]
//!     .serialize(&mut Serializer::new(&mut writer))
//!     .unwrap();
//! assert_eq!(writer.as_bytes(), br#"[{"Circle":{"r":1.5}},"Empty"]"#);
//! ```

use crate::decimal::DECIMAL_TOKEN;
use crate::error::{Error, Result};
use crate::writer::Writer;
use serde::ser::{self, Impossible, Serialize};

/// Serde serializer writing JSON into a [`Writer`].
pub struct Serializer<'a, 'w> {
    writer: &'a mut Writer<'w>,
}

impl<'a, 'w> Serializer<'a, 'w> {
    pub fn new(writer: &'a mut Writer<'w>) -> Self {
        Serializer { writer }
    }

    /// The underlying writer.
    pub fn writer(&mut self) -> &mut Writer<'w> {
        self.writer
    }
}

impl<'s, 'a, 'w> ser::Serializer for &'s mut Serializer<'a, 'w> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Compound<'s, 'a, 'w>;
    type SerializeTuple = Compound<'s, 'a, 'w>;
    type SerializeTupleStruct = Compound<'s, 'a, 'w>;
    type SerializeTupleVariant = Compound<'s, 'a, 'w>;
    type SerializeMap = Compound<'s, 'a, 'w>;
    type SerializeStruct = Compound<'s, 'a, 'w>;
    type SerializeStructVariant = Compound<'s, 'a, 'w>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.writer.write_bool(v);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.writer.write_int(v);
        Ok(())
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        self.writer.write_ascii(&v.to_string());
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.writer.write_f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.writer.write_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.writer.write_string(v.encode_utf8(&mut [0u8; 4]));
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.writer.write_string(v);
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.writer.write_binary(v)
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.writer.write_null();
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        if name == DECIMAL_TOKEN {
            return value.serialize(RawNumber {
                writer: &mut *self.writer,
            });
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.writer.write_byte(b'{');
        self.writer.write_key(variant);
        value.serialize(&mut *self)?;
        self.writer.write_byte(b'}');
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'s, 'a, 'w>> {
        self.writer.write_byte(b'[');
        Ok(Compound::new(self, b']', false))
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'s, 'a, 'w>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'s, 'a, 'w>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'s, 'a, 'w>> {
        self.writer.write_byte(b'{');
        self.writer.write_key(variant);
        self.writer.write_byte(b'[');
        Ok(Compound::new(self, b']', true))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'s, 'a, 'w>> {
        self.writer.write_byte(b'{');
        Ok(Compound::new(self, b'}', false))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Compound<'s, 'a, 'w>> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'s, 'a, 'w>> {
        self.writer.write_byte(b'{');
        self.writer.write_key(variant);
        self.writer.write_byte(b'{');
        Ok(Compound::new(self, b'}', true))
    }
}

/// State for arrays, objects and enum variants in progress.
pub struct Compound<'s, 'a, 'w> {
    ser: &'s mut Serializer<'a, 'w>,
    closer: u8,
    /// Enum variant wrapper to close after `closer`.
    tagged: bool,
    first: bool,
}

impl<'s, 'a, 'w> Compound<'s, 'a, 'w> {
    fn new(ser: &'s mut Serializer<'a, 'w>, closer: u8, tagged: bool) -> Self {
        Compound {
            ser,
            closer,
            tagged,
            first: true,
        }
    }

    fn separator(&mut self) {
        if self.first {
            self.first = false;
        } else {
            self.ser.writer.write_byte(b',');
        }
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.separator();
        value.serialize(&mut *self.ser)
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.separator();
        self.ser.writer.write_key(key);
        value.serialize(&mut *self.ser)
    }

    fn close(self) -> Result<()> {
        self.ser.writer.write_byte(self.closer);
        if self.tagged {
            self.ser.writer.write_byte(b'}');
        }
        Ok(())
    }
}

impl ser::SerializeSeq for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl ser::SerializeTuple for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl ser::SerializeTupleVariant for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl ser::SerializeMap for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.separator();
        key.serialize(MapKey {
            writer: &mut *self.ser.writer,
        })
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl ser::SerializeStruct for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

impl ser::SerializeStructVariant for Compound<'_, '_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.close()
    }
}

fn key_must_be_a_string() -> Error {
    Error::custom("map key must be a string, integer, char or bool")
}

/// Writes a map key, quoting scalars, followed by `:`.
struct MapKey<'a, 'w> {
    writer: &'a mut Writer<'w>,
}

impl MapKey<'_, '_> {
    fn quoted(self, text: &str) -> Result<()> {
        self.writer.write_key(text);
        Ok(())
    }
}

macro_rules! quoted_int_keys {
    ($($method:ident: $t:ty),*) => {
        $(fn $method(self, v: $t) -> Result<()> {
            self.quoted(itoa::Buffer::new().format(v))
        })*
    };
}

impl ser::Serializer for MapKey<'_, '_> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    quoted_int_keys!(
        serialize_i8: i8, serialize_i16: i16, serialize_i32: i32, serialize_i64: i64,
        serialize_u8: u8, serialize_u16: u16, serialize_u32: u32, serialize_u64: u64
    );

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.quoted(if v { "true" } else { "false" })
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        Err(key_must_be_a_string())
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        Err(key_must_be_a_string())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.quoted(v.encode_utf8(&mut [0u8; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.quoted(v)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        Err(key_must_be_a_string())
    }

    fn serialize_none(self) -> Result<()> {
        Err(key_must_be_a_string())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        Err(key_must_be_a_string())
    }

    fn serialize_unit(self) -> Result<()> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(key_must_be_a_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.quoted(variant)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        Err(key_must_be_a_string())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_must_be_a_string())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_must_be_a_string())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_must_be_a_string())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_must_be_a_string())
    }
}

/// Receives a decimal's canonical text and writes it unquoted.
struct RawNumber<'a, 'w> {
    writer: &'a mut Writer<'w>,
}

fn not_a_decimal() -> Error {
    Error::custom("decimal token must wrap its canonical text")
}

impl ser::Serializer for RawNumber<'_, '_> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    fn serialize_str(self, v: &str) -> Result<()> {
        self.writer.write_ascii(v);
        Ok(())
    }

    fn serialize_bool(self, _v: bool) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_i64(self, _v: i64) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_u64(self, _v: u64) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_i8(self, _v: i8) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_i16(self, _v: i16) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_i32(self, _v: i32) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_u8(self, _v: u8) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_u16(self, _v: u16) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_u32(self, _v: u32) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_char(self, _v: char) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_none(self) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        Err(not_a_decimal())
    }

    fn serialize_unit(self) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        Err(not_a_decimal())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, _value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        Err(not_a_decimal())
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        Err(not_a_decimal())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_decimal())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_decimal())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_decimal())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_decimal())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(not_a_decimal())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(not_a_decimal())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_decimal())
    }
}
