//! Built-in converters and structural analyzers.
//!
//! Scalars get exact converters. Collections, options, string-keyed maps
//! and boxes describe themselves through [`JsonType::structure`]; the
//! analyzer factories installed here turn those recipes into converters the
//! first time an instantiation is looked up.

use crate::binary::Binary;
use crate::decimal::Decimal;
use crate::descriptor::{JsonType, Shape, Structure, TypeDescriptor};
use crate::error::{Error, Result};
use crate::map::JsonMap;
use crate::number::{Number, NumberKind};
use crate::reader::Reader;
use crate::registry::{BindingRegistry, ReadFn, RegistryBuilder, Request, WriteFn};
use crate::value::{self, Value};
use crate::writer::Writer;
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use uuid::Uuid;

macro_rules! plain_types {
    ($($t:ty),* $(,)?) => {
        $(impl JsonType for $t {})*
    };
}

plain_types!(
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize, f32, f64, char, String,
    Decimal, Number, BigInt, Value, JsonMap, Binary, Uuid
);

macro_rules! collection_type {
    ($name:literal, $ty:ident $(, $bound:path)*) => {
        impl<E: JsonType $(+ $bound)*> JsonType for $ty<E> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::generic::<Self>($name, vec![E::descriptor()])
            }

            fn structure() -> Structure<Self> {
                Structure::new(
                    Shape::Collection,
                    collection_reader::<Self, E>,
                    collection_writer::<Self, E>,
                )
            }
        }
    };
}

collection_type!("Vec", Vec);
collection_type!("VecDeque", VecDeque);
collection_type!("HashSet", HashSet, Eq, Hash);
collection_type!("BTreeSet", BTreeSet, Ord);

macro_rules! map_type {
    ($name:literal, $ty:ident) => {
        impl<V: JsonType> JsonType for $ty<String, V> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::generic::<Self>(
                    $name,
                    vec![TypeDescriptor::exact::<String>(), V::descriptor()],
                )
            }

            fn structure() -> Structure<Self> {
                Structure::new(Shape::Map, map_reader::<Self, V>, map_writer::<Self, V>)
            }
        }
    };
}

map_type!("HashMap", HashMap);
map_type!("BTreeMap", BTreeMap);
map_type!("IndexMap", IndexMap);

impl<T: JsonType> JsonType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::generic::<Self>("Option", vec![T::descriptor()])
    }

    fn structure() -> Structure<Self> {
        Structure::new(Shape::Optional, option_reader::<T>, option_writer::<T>)
    }
}

impl<T: JsonType> JsonType for Box<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::generic::<Self>("Box", vec![T::descriptor()])
    }

    fn structure() -> Structure<Self> {
        Structure::new(Shape::Boxed, boxed_reader::<T>, boxed_writer::<T>)
    }
}

fn collection_reader<C, E>(registry: &BindingRegistry) -> Option<ReadFn<C>>
where
    C: FromIterator<E> + 'static,
    E: JsonType,
{
    let element = registry.try_find_reader::<E>()?;
    Some(Arc::new(move |reader: &mut Reader<'_>| -> Result<C> {
        let mut items = Vec::new();
        reader.read_array(|r| {
            items.push(element(r)?);
            Ok(())
        })?;
        Ok(items.into_iter().collect())
    }))
}

fn collection_writer<C, E>(registry: &BindingRegistry) -> Option<WriteFn<C>>
where
    C: 'static,
    for<'x> &'x C: IntoIterator<Item = &'x E>,
    E: JsonType,
{
    let element = registry.try_find_writer::<E>()?;
    Some(Arc::new(move |writer: &mut Writer<'_>, items: &C| -> Result<()> {
        writer.write_byte(b'[');
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                writer.write_byte(b',');
            }
            element(writer, item)?;
        }
        writer.write_byte(b']');
        Ok(())
    }))
}

fn map_reader<M, V>(registry: &BindingRegistry) -> Option<ReadFn<M>>
where
    M: FromIterator<(String, V)> + 'static,
    V: JsonType,
{
    let value = registry.try_find_reader::<V>()?;
    Some(Arc::new(move |reader: &mut Reader<'_>| -> Result<M> {
        let mut entries = Vec::new();
        reader.read_object(|r, key| {
            entries.push((key, value(r)?));
            Ok(())
        })?;
        Ok(entries.into_iter().collect())
    }))
}

fn map_writer<M, V>(registry: &BindingRegistry) -> Option<WriteFn<M>>
where
    M: 'static,
    for<'x> &'x M: IntoIterator<Item = (&'x String, &'x V)>,
    V: JsonType,
{
    let value = registry.try_find_writer::<V>()?;
    Some(Arc::new(move |writer: &mut Writer<'_>, map: &M| -> Result<()> {
        writer.write_byte(b'{');
        for (i, (key, item)) in map.into_iter().enumerate() {
            if i > 0 {
                writer.write_byte(b',');
            }
            writer.write_key(key);
            value(writer, item)?;
        }
        writer.write_byte(b'}');
        Ok(())
    }))
}

fn option_reader<T: JsonType>(registry: &BindingRegistry) -> Option<ReadFn<Option<T>>> {
    let inner = registry.try_find_reader::<T>()?;
    Some(Arc::new(move |reader: &mut Reader<'_>| -> Result<Option<T>> {
        if reader.was_null()? {
            Ok(None)
        } else {
            inner(reader).map(Some)
        }
    }))
}

fn option_writer<T: JsonType>(registry: &BindingRegistry) -> Option<WriteFn<Option<T>>> {
    let inner = registry.try_find_writer::<T>()?;
    Some(Arc::new(
        move |writer: &mut Writer<'_>, value: &Option<T>| -> Result<()> {
            match value {
                Some(v) => inner(writer, v),
                None => {
                    writer.write_null();
                    Ok(())
                }
            }
        },
    ))
}

fn boxed_reader<T: JsonType>(registry: &BindingRegistry) -> Option<ReadFn<Box<T>>> {
    let inner = registry.try_find_reader::<T>()?;
    Some(Arc::new(move |reader: &mut Reader<'_>| -> Result<Box<T>> {
        inner(reader).map(Box::new)
    }))
}

fn boxed_writer<T: JsonType>(registry: &BindingRegistry) -> Option<WriteFn<Box<T>>> {
    let inner = registry.try_find_writer::<T>()?;
    Some(Arc::new(
        move |writer: &mut Writer<'_>, value: &Box<T>| -> Result<()> { inner(writer, value) },
    ))
}

/// Factory that synthesizes converters for every type of `shape`.
pub fn analyzer<C: 'static>(
    shape: Shape,
) -> impl Fn(&Request<'_, C>) -> Option<C> + Send + Sync + 'static {
    move |request| {
        if request.shape() == shape {
            request.synthesize()
        } else {
            None
        }
    }
}

fn read_char(reader: &mut Reader<'_>) -> Result<char> {
    let at = reader.position();
    let s = reader.read_str()?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::InvalidToken {
            offset: at.saturating_sub(1),
            expected: "single-character string".to_string(),
            found: format!("{s:?}"),
        }),
    }
}

fn read_uuid(reader: &mut Reader<'_>) -> Result<Uuid> {
    let at = reader.position();
    let s = reader.read_str()?;
    Uuid::parse_str(s).map_err(|e| Error::InvalidToken {
        offset: at,
        expected: "UUID string".to_string(),
        found: e.to_string(),
    })
}

fn read_bigint(reader: &mut Reader<'_>) -> Result<BigInt> {
    let at = reader.position().saturating_sub(1);
    let limit = reader.options().max_number_digits as u64;
    let decimal = reader.read_decimal()?;
    let unscaled = decimal.unscaled();
    if unscaled.sign() == num_bigint::Sign::NoSign {
        return Ok(BigInt::default());
    }
    let shift = decimal.scale().unsigned_abs();
    if decimal.scale() <= 0 {
        // bits * 3 / 10 never exceeds the digit count
        if unscaled.bits() * 3 / 10 + u64::from(shift) > limit {
            return Err(Error::limit_exceeded(at, "integer exceeds the digit limit"));
        }
        return Ok(unscaled * BigInt::from(10u8).pow(shift));
    }
    // |unscaled| < 2^bits <= 10^scale
    if u64::from(shift) >= unscaled.bits() {
        return Err(Error::invalid_number(at, "fractional value for an integer target"));
    }
    let divisor = BigInt::from(10u8).pow(shift);
    if (unscaled % &divisor).sign() != num_bigint::Sign::NoSign {
        return Err(Error::invalid_number(at, "fractional value for an integer target"));
    }
    Ok(unscaled / divisor)
}

macro_rules! register_ints {
    ($builder:ident; $($t:ty),*) => {
        $(
            let $builder = $builder
                .register_reader::<$t, _>(|r| r.read_int::<$t>())
                .register_writer::<$t, _>(|w, v| {
                    w.write_int(*v);
                    Ok(())
                });
        )*
    };
}

/// Registers the built-in converters and analyzers.
pub(crate) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    register_ints!(builder; i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

    let builder = builder
        .register_reader::<bool, _>(|r| r.read_bool())
        .register_writer::<bool, _>(|w, v| {
            w.write_bool(*v);
            Ok(())
        })
        .register_reader::<f64, _>(|r| r.read_f64())
        .register_writer::<f64, _>(|w, v| w.write_f64(*v))
        .register_reader::<f32, _>(|r| r.read_f32())
        .register_writer::<f32, _>(|w, v| w.write_f32(*v))
        .register_reader::<String, _>(|r| r.read_string())
        .register_writer::<String, _>(|w, v| {
            w.write_string(v);
            Ok(())
        })
        .register_reader::<char, _>(read_char)
        .register_writer::<char, _>(|w, v| {
            w.write_string(v.encode_utf8(&mut [0u8; 4]));
            Ok(())
        })
        .register_reader::<Decimal, _>(|r| r.read_decimal())
        .register_writer::<Decimal, _>(|w, v| {
            w.write_decimal(v);
            Ok(())
        })
        .register_reader::<Number, _>(|r| r.read_number(NumberKind::Any))
        .register_writer::<Number, _>(|w, v| w.write_number(v))
        .register_reader::<BigInt, _>(read_bigint)
        .register_writer::<BigInt, _>(|w, v| {
            w.write_bigint(v);
            Ok(())
        })
        .register_reader::<Binary, _>(|r| r.read_base64().map(Binary))
        .register_writer::<Binary, _>(|w, v| w.write_binary(v))
        .register_reader::<Uuid, _>(read_uuid)
        .register_writer::<Uuid, _>(|w, v| {
            w.write_string(v.hyphenated().encode_lower(&mut Uuid::encode_buffer()));
            Ok(())
        })
        .register_reader::<Value, _>(value::read_value)
        .register_writer::<Value, _>(value::write_value)
        .register_reader::<JsonMap, _>(value::read_map)
        .register_writer::<JsonMap, _>(value::write_map);

    let mut builder = builder;
    for shape in [Shape::Collection, Shape::Optional, Shape::Map, Shape::Boxed] {
        builder = builder
            .register_reader_factory(analyzer(shape))
            .register_writer_factory(analyzer(shape));
    }
    builder
}
