//! The entry point: registry lookup plus reader/writer lifecycle.
//!
//! An [`Engine`] pairs a frozen [`BindingRegistry`] with [`Options`] and a
//! [`BufferPool`]. It is cheap to clone and safe to share; every call works
//! on its own reader or writer.
//!
//! ```rust
//! use jsonbind::Engine;
//!
//! let engine = Engine::new();
//! let numbers: Vec<u32> = engine.deserialize("[1, 2, 3]".as_bytes()).unwrap();
//! assert_eq!(numbers, vec![1, 2, 3]);
//!
//! let mut out = Vec::new();
//! let written = engine.serialize(&numbers, &mut out).unwrap();
//! assert_eq!(written, 7);
//! assert_eq!(out, b"[1,2,3]");
//! ```

use crate::descriptor::JsonType;
use crate::error::{Error, ErrorKind, Result};
use crate::options::Options;
use crate::pool::BufferPool;
use crate::reader::Reader;
use crate::registry::{BindingRegistry, ReadFn};
use crate::writer::Writer;
use std::fmt;
use std::io::{Read, Write};
use std::iter::FusedIterator;
use std::sync::Arc;

/// Serializes and deserializes registered types.
#[derive(Clone, Debug)]
pub struct Engine {
    registry: BindingRegistry,
    options: Options,
    pool: Arc<BufferPool>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine over the built-in converters with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(BindingRegistry::default(), Options::default())
    }

    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self::from_parts(BindingRegistry::default(), options)
    }

    #[must_use]
    pub fn with_registry(registry: BindingRegistry) -> Self {
        Self::from_parts(registry, Options::default())
    }

    #[must_use]
    pub fn from_parts(registry: BindingRegistry, options: Options) -> Self {
        let pool = Arc::new(BufferPool::new(options.pool_size, options.buffer_size));
        Engine {
            registry,
            options,
            pool,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    // ---- writing -------------------------------------------------------

    /// Writes `value` to `sink` and returns the number of bytes written.
    pub fn serialize<T: JsonType, W: Write>(&self, value: &T, sink: W) -> Result<u64> {
        let write = self.registry.find_writer::<T>()?;
        let mut writer = Writer::with_buffer(self.pool.checkout(), &self.options);
        writer.reset_sink(sink);
        let result = write(&mut writer, value)
            .and_then(|()| writer.flush())
            .map(|()| writer.size());
        self.pool.checkin(writer.into_inner());
        result
    }

    /// Appends `value` to a caller-owned writer, which can be reused across
    /// calls.
    pub fn serialize_into<T: JsonType>(&self, value: &T, writer: &mut Writer<'_>) -> Result<()> {
        let write = self.registry.find_writer::<T>()?;
        write(writer, value)
    }

    pub fn to_vec<T: JsonType>(&self, value: &T) -> Result<Vec<u8>> {
        let mut writer = Writer::with_options(&self.options);
        self.serialize_into(value, &mut writer)?;
        Ok(writer.into_inner())
    }

    pub fn to_string<T: JsonType>(&self, value: &T) -> Result<String> {
        let bytes = self.to_vec(value)?;
        String::from_utf8(bytes).map_err(Error::custom)
    }

    // ---- reading -------------------------------------------------------

    /// Reads one `T` from `source`, which must hold exactly one document.
    pub fn deserialize<T: JsonType, R: Read>(&self, source: R) -> Result<T> {
        let read = self.registry.find_reader::<T>()?;
        let mut reader = Reader::from_stream_with_buffer(source, self.pool.checkout(), &self.options);
        let result = read_document(&mut reader, &read);
        if let Some(buffer) = reader.into_buffer() {
            self.pool.checkin(buffer);
        }
        result
    }

    /// Reads one `T` from the first `len` bytes of `bytes`.
    pub fn deserialize_bytes<T: JsonType>(&self, bytes: &[u8], len: usize) -> Result<T> {
        let input = bytes.get(..len).ok_or_else(|| {
            Error::custom(format!("length {len} exceeds the {} byte input", bytes.len()))
        })?;
        let read = self.registry.find_reader::<T>()?;
        read_document(&mut Reader::with_options(input, &self.options), &read)
    }

    /// Reads a document into an existing value, reusing what the value's
    /// binder can reuse.
    pub fn deserialize_into<T: JsonType>(&self, target: &mut T, bytes: &[u8]) -> Result<()> {
        let bind = self.registry.try_find_binder::<T>().ok_or_else(|| {
            Error::no_converter(format!("binder for {}", T::descriptor()))
        })?;
        let mut reader = Reader::with_options(bytes, &self.options);
        reader.advance()?;
        bind(&mut reader, target)?;
        reader.finish()
    }

    /// Lazily reads a sequence of `T` from `source`.
    ///
    /// The source is either one top-level array, whose elements are yielded,
    /// or whitespace-separated documents. An element that fails after its
    /// value was fully consumed (a number out of range, a missing field)
    /// yields its error and iteration continues with the next element. Any
    /// other error ends the iteration.
    pub fn iterate_over<'a, T: JsonType, R: Read + 'a>(&self, source: R) -> Result<Items<'a, T>> {
        let read = self.registry.find_reader::<T>()?;
        let reader = Reader::from_stream_with_buffer(source, self.pool.checkout(), &self.options);
        Ok(Items {
            reader: Some(reader),
            read,
            state: State::Start,
            element_depth: 0,
            pool: Arc::clone(&self.pool),
        })
    }
}

fn read_document<T>(reader: &mut Reader<'_>, read: &ReadFn<T>) -> Result<T> {
    reader.advance()?;
    let value = read(reader)?;
    reader.finish()?;
    Ok(value)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    InArray,
    Documents,
    Done,
}

/// Iterator returned by [`Engine::iterate_over`].
pub struct Items<'a, T> {
    reader: Option<Reader<'a>>,
    read: ReadFn<T>,
    state: State,
    /// Reader depth at the start of the current element.
    element_depth: usize,
    pool: Arc<BufferPool>,
}

impl<T> fmt::Debug for Items<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Items").field("state", &self.state).finish()
    }
}

impl<T> Items<'_, T> {
    fn step(&mut self) -> Result<Option<T>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        match self.state {
            State::Done => return Ok(None),
            State::Start => {
                if reader.at_end()? {
                    self.state = State::Done;
                    return Ok(None);
                }
                if reader.advance()? == b'[' {
                    reader.enter()?;
                    if reader.advance()? == b']' {
                        reader.leave();
                        reader.finish()?;
                        self.state = State::Done;
                        return Ok(None);
                    }
                    self.state = State::InArray;
                } else {
                    self.state = State::Documents;
                }
            }
            State::InArray => match reader.advance()? {
                b',' => {
                    reader.advance()?;
                }
                b']' => {
                    reader.leave();
                    reader.finish()?;
                    self.state = State::Done;
                    return Ok(None);
                }
                _ => return Err(reader.unexpected("',' or ']'")),
            },
            State::Documents => {
                if reader.at_end()? {
                    self.state = State::Done;
                    return Ok(None);
                }
                reader.advance()?;
            }
        }
        self.element_depth = reader.depth();
        (self.read)(reader).map(Some)
    }

    /// Whether the failed element was consumed whole, so the next one can
    /// still be read.
    fn can_resume(&self, err: &Error) -> bool {
        let consumed = matches!(
            err.kind(),
            ErrorKind::NumberOverflow
                | ErrorKind::InvalidNumber
                | ErrorKind::MissingField
                | ErrorKind::UnknownField
        );
        consumed
            && matches!(self.state, State::InArray | State::Documents)
            && self
                .reader
                .as_ref()
                .is_some_and(|reader| reader.depth() == self.element_depth)
    }

    fn release(&mut self) {
        if let Some(buffer) = self.reader.take().and_then(Reader::into_buffer) {
            self.pool.checkin(buffer);
        }
    }
}

impl<T> Iterator for Items<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.release();
                None
            }
            Err(err) if self.can_resume(&err) => Some(Err(err)),
            Err(err) => {
                self.state = State::Done;
                self.release();
                Some(Err(err))
            }
        }
    }
}

impl<T> FusedIterator for Items<'_, T> {}

impl<T> Drop for Items<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::NonFinitePolicy;
    use crate::value::Value;
    use std::io;

    /// Hands out its input a few bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn iterates_top_level_array() {
        let engine = Engine::new();
        let items: Vec<i32> = engine
            .iterate_over(&b"[1,2,3]"[..])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn iterates_whitespace_separated_documents() {
        let engine = Engine::new();
        let source = Trickle {
            data: b"{\"a\":1}\n{\"b\":[true]}\n\n\"tail\" ",
            step: 2,
        };
        let items: Vec<Value> = engine
            .iterate_over(source)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1]["b"][0], Value::Bool(true));
        assert_eq!(items[2].as_str(), Some("tail"));
    }

    #[test]
    fn iteration_continues_past_a_bad_element() {
        let engine = Engine::new();
        let mut items = engine.iterate_over::<u8, _>(&b"[1, 300, 3, 1.5, 4]"[..]).unwrap();
        assert_eq!(items.next().unwrap().unwrap(), 1);
        let err = items.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumberOverflow);
        assert_eq!(err.offset(), Some(4));
        assert_eq!(items.next().unwrap().unwrap(), 3);
        assert_eq!(items.next().unwrap().unwrap_err().kind(), ErrorKind::InvalidNumber);
        assert_eq!(items.next().unwrap().unwrap(), 4);
        assert!(items.next().is_none());

        let documents = Trickle {
            data: b"7 -1 9",
            step: 1,
        };
        let items: Vec<Result<u8>> = engine.iterate_over(documents).unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items[1].is_err());
        assert_eq!(*items[2].as_ref().unwrap(), 9);
    }

    #[test]
    fn iteration_stops_after_a_syntax_error() {
        let engine = Engine::new();
        let mut items = engine.iterate_over::<u8, _>(&b"[1, x, 3]"[..]).unwrap();
        assert_eq!(items.next().unwrap().unwrap(), 1);
        assert_eq!(items.next().unwrap().unwrap_err().kind(), ErrorKind::InvalidToken);
        assert!(items.next().is_none());
        assert!(items.next().is_none());

        let mut items = engine.iterate_over::<u8, _>(&b"[1 2]"[..]).unwrap();
        assert_eq!(items.next().unwrap().unwrap(), 1);
        assert!(items.next().unwrap().is_err());
        assert!(items.next().is_none());
    }

    #[test]
    fn empty_sources() {
        let engine = Engine::new();
        assert_eq!(engine.iterate_over::<u8, _>(&b"  "[..]).unwrap().count(), 0);
        assert_eq!(engine.iterate_over::<u8, _>(&b"[ ]"[..]).unwrap().count(), 0);
    }

    #[test]
    fn buffers_return_to_the_pool() {
        let engine = Engine::new();
        for _ in 0..3 {
            let mut out = Vec::new();
            engine.serialize(&"pooled".to_string(), &mut out).unwrap();
            let back: String = engine.deserialize(&out[..]).unwrap();
            assert_eq!(back, "pooled");
        }
        assert_eq!(engine.pool().stats().misses, 1);
    }

    #[test]
    fn bytes_with_length() {
        let engine = Engine::new();
        let bytes = b"[1,2]garbage";
        let values: Vec<i64> = engine.deserialize_bytes(bytes, 5).unwrap();
        assert_eq!(values, vec![1, 2]);
        assert!(engine.deserialize_bytes::<Vec<i64>>(bytes, 6).is_err());
        assert!(engine.deserialize_bytes::<Vec<i64>>(bytes, 100).is_err());
    }

    #[test]
    fn reusable_writer() {
        let engine = Engine::new();
        let mut writer = Writer::new();
        engine.serialize_into(&vec![true, false], &mut writer).unwrap();
        assert_eq!(writer.as_bytes(), b"[true,false]");
        writer.reset();
        engine.serialize_into(&Some(5u8), &mut writer).unwrap();
        assert_eq!(writer.as_bytes(), b"5");
    }

    #[test]
    fn non_finite_policy_applies() {
        let strict = Engine::new();
        assert_eq!(
            strict.to_string(&f64::INFINITY).unwrap_err().kind(),
            ErrorKind::NonFiniteNumber
        );
        let lenient = Engine::with_options(Options::new().with_non_finite(NonFinitePolicy::Null));
        assert_eq!(lenient.to_string(&f64::NAN).unwrap(), "null");
    }

    #[test]
    fn unregistered_types_fail_cleanly() {
        #[derive(Debug)]
        struct Opaque;
        impl JsonType for Opaque {}
        let engine = Engine::new();
        let err = engine.deserialize::<Opaque, _>(&b"{}"[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConverterFound);
    }
}
