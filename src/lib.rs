//! # jsonbind
//!
//! A streaming JSON codec with a type-keyed converter registry.
//!
//! ## Overview
//!
//! - **Reader / Writer**: a pull tokenizer and a push emitter over byte
//!   buffers, with stream refill and direct sink flushing.
//! - **Numeric and text codecs**: exact integers, shortest round-trip floats,
//!   arbitrary-precision [`Decimal`]s, UTF-8 aware string escaping, base64
//!   [`Binary`] and UUID strings.
//! - **Binding registry**: maps a type to its reader and writer. Generic
//!   shapes (`Vec<T>`, `Option<T>`, maps, boxes) are synthesized by analyzer
//!   factories once per instantiation and cached.
//! - **Engine**: the facade that ties a registry, [`Options`] and a buffer
//!   pool together; `serialize`, `deserialize` and lazy `iterate_over`.
//! - **Serde bridge**: any `Serialize`/`Deserialize` type streams through the
//!   same reader and writer, without an intermediate tree.
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonbind::{Engine, RegistryBuilder};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     tags: Vec<String>,
//! }
//! impl jsonbind::JsonType for User {}
//!
//! let engine = Engine::with_registry(RegistryBuilder::new().register_serde::<User>().build());
//!
//! let users: Vec<User> = engine
//!     .deserialize(r#"[{"id": 1, "name": "Alice", "tags": ["admin"]}]"#.as_bytes())
//!     .unwrap();
//! assert_eq!(users[0].name, "Alice");
//! assert_eq!(
//!     engine.to_string(&users).unwrap(),
//!     r#"[{"id":1,"name":"Alice","tags":["admin"]}]"#
//! );
//! ```
//!
//! Without a registry, the serde helpers work directly:
//!
//! ```rust
//! let pair: (String, Option<u8>) = jsonbind::from_str(r#"["a", null]"#).unwrap();
//! assert_eq!(jsonbind::to_string(&pair).unwrap(), r#"["a",null]"#);
//! ```
//!
//! ## Dynamic values
//!
//! ```rust
//! use jsonbind::{json, Value};
//!
//! let value: Value = jsonbind::from_str(r#"{"price": 19.99, "qty": 3}"#).unwrap();
//! assert_eq!(value["qty"].as_i64(), Some(3));
//! assert_eq!(json!({"ok": true}).to_string(), r#"{"ok":true}"#);
//! ```
//!
//! ## Numbers
//!
//! Integers are written through `itoa`, floats through `ryu`. `NaN` and the
//! infinities follow [`NonFinitePolicy`]; the default rejects them.
//! Decimals keep every digit and their scale: `1E28` is written back as
//! `1E+28`.

mod binary;
pub mod converters;
pub mod de;
mod decimal;
mod descriptor;
mod engine;
mod error;
pub mod macros;
mod map;
pub mod number;
mod object;
mod options;
mod pool;
mod reader;
mod registry;
pub mod ser;
pub mod text;
mod value;
mod writer;

pub use binary::Binary;
pub use decimal::Decimal;
pub use de::Deserializer;
pub use descriptor::{JsonType, Shape, Structure, TypeDescriptor, TypeKey};
pub use engine::{Engine, Items};
pub use error::{Error, ErrorKind, Result};
pub use map::JsonMap;
pub use number::{JsonInt, Number, NumberKind};
pub use object::ObjectDescription;
pub use options::{NonFinitePolicy, Options, UnknownFieldPolicy};
pub use pool::{BufferPool, PoolStats};
pub use reader::Reader;
pub use registry::{
    BindFn, BindingRegistry, ErasedReader, ErasedWriter, Factory, LazyReader, LazyWriter, ReadFn,
    ReaderFactory, ReaderRequest, RegistryBuilder, Request, WeakRegistry, WriteFn, WriterFactory,
    WriterRequest,
};
pub use ser::Serializer;
pub use value::Value;
pub use writer::Writer;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Serializes any `T: Serialize` to JSON bytes.
///
/// # Errors
///
/// Fails if `T`'s serialization reports an error, a map key is not a
/// scalar, or a non-finite float meets the default policy.
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_vec_with_options(value, &Options::default())
}

/// Like [`to_vec`], honoring `options` (non-finite policy, buffer size).
///
/// ```rust
/// use jsonbind::{to_vec_with_options, NonFinitePolicy, Options};
///
/// let options = Options::new().with_non_finite(NonFinitePolicy::Quoted);
/// assert_eq!(to_vec_with_options(&[1.0, f64::NAN], &options).unwrap(), br#"[1.0,"NaN"]"#);
/// ```
pub fn to_vec_with_options<T>(value: &T, options: &Options) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut writer = Writer::with_options(options);
    value.serialize(&mut Serializer::new(&mut writer))?;
    Ok(writer.into_inner())
}

/// Serializes any `T: Serialize` to a JSON string.
///
/// ```rust
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(jsonbind::to_string(&Point { x: 1, y: -2 }).unwrap(), r#"{"x":1,"y":-2}"#);
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    String::from_utf8(to_vec(value)?).map_err(Error::custom)
}

/// Serializes any `T: Serialize` into an [`io::Write`] sink.
///
/// ```rust
/// let mut buffer = Vec::new();
/// jsonbind::to_writer(&mut buffer, &vec!["a", "b"]).unwrap();
/// assert_eq!(buffer, br#"["a","b"]"#);
/// ```
pub fn to_writer<W, T>(sink: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let mut writer = Writer::to_sink(sink, &Options::default());
    value.serialize(&mut Serializer::new(&mut writer))?;
    writer.flush()
}

/// Deserializes `T` from JSON bytes holding exactly one document.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    de::from_document(&mut Reader::from_slice(bytes))
}

/// Like [`from_slice`], honoring `options` (depth limit, array format).
pub fn from_slice_with_options<T: DeserializeOwned>(bytes: &[u8], options: &Options) -> Result<T> {
    de::from_document(&mut Reader::with_options(bytes, options))
}

/// Deserializes `T` from a JSON string.
///
/// ```rust
/// let numbers: Vec<i32> = jsonbind::from_str("[1, 2, 3]").unwrap();
/// assert_eq!(numbers, vec![1, 2, 3]);
/// ```
pub fn from_str<T: DeserializeOwned>(s: &str) -> Result<T> {
    from_slice(s.as_bytes())
}

/// Deserializes `T` from a byte stream, refilling a bounded buffer as it
/// goes.
///
/// ```rust
/// use std::io::Cursor;
///
/// let text: String = jsonbind::from_reader(Cursor::new(br#""streamed""#.to_vec())).unwrap();
/// assert_eq!(text, "streamed");
/// ```
pub fn from_reader<R: io::Read, T: DeserializeOwned>(source: R) -> Result<T> {
    de::from_document(&mut Reader::from_stream(source, &Options::default()))
}

/// Converts any `T: Serialize` into a [`Value`].
///
/// The conversion goes through the JSON text, so it sees exactly what
/// [`to_vec`] would write.
///
/// ```rust
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value = jsonbind::to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert!(value.is_object());
/// assert_eq!(value["y"].as_i64(), Some(2));
/// ```
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    let bytes = to_vec(value)?;
    let mut reader = Reader::from_slice(&bytes);
    reader.advance()?;
    let tree = crate::value::read_value(&mut reader)?;
    reader.finish()?;
    Ok(tree)
}

/// Converts a [`Value`] into any `T: DeserializeOwned`.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    let mut writer = Writer::new();
    crate::value::write_value(&mut writer, value)?;
    from_slice(writer.as_bytes())
}
