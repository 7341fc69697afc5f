//! Push-based JSON writer.
//!
//! A [`Writer`] accumulates bytes in a growable buffer. In-memory writers
//! keep everything until [`Writer::to_stream`] or [`Writer::into_inner`];
//! sink-bound writers hand the buffer to their sink whenever it passes
//! [`Options::flush_threshold`]. Room for every value is reserved before the
//! value is written, so nothing is ever written partially.
//!
//! ```rust
//! use jsonbind::Writer;
//!
//! let mut writer = Writer::new();
//! writer.write_byte(b'[');
//! writer.write_int(42u8);
//! writer.write_byte(b',');
//! writer.write_string("Hello World!");
//! writer.write_byte(b',');
//! writer.write_null();
//! writer.write_byte(b']');
//! assert_eq!(writer.as_bytes(), br#"[42,"Hello World!",null]"#);
//! ```

use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::number::{self, JsonInt, Number};
use crate::options::{NonFinitePolicy, Options};
use crate::text;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use num_bigint::{BigInt, Sign};
use std::fmt;
use std::io::Write;

/// Streaming JSON writer over an in-memory buffer or an [`io::Write`](Write) sink.
pub struct Writer<'w> {
    buf: Vec<u8>,
    sink: Option<Box<dyn Write + 'w>>,
    /// Bytes already handed to the sink.
    flushed: u64,
    /// First sink failure; reported by [`Writer::flush`].
    failure: Option<Error>,
    options: Options,
}

impl fmt::Debug for Writer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("buffered", &self.buf.len())
            .field("flushed", &self.flushed)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for Writer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'w> Writer<'w> {
    /// Creates an in-memory writer with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(&Options::default())
    }

    #[must_use]
    pub fn with_options(options: &Options) -> Self {
        Self::with_buffer(Vec::with_capacity(options.buffer_size), options)
    }

    /// Creates an in-memory writer that reuses `buffer`'s allocation.
    #[must_use]
    pub fn with_buffer(mut buffer: Vec<u8>, options: &Options) -> Self {
        buffer.clear();
        Writer {
            buf: buffer,
            sink: None,
            flushed: 0,
            failure: None,
            options: options.clone(),
        }
    }

    /// Creates a writer that streams to `sink`.
    pub fn to_sink<W: Write + 'w>(sink: W, options: &Options) -> Self {
        let mut writer = Self::with_options(options);
        writer.sink = Some(Box::new(sink));
        writer
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Clears buffered bytes for reuse, keeping the allocation and sink.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.flushed = 0;
        self.failure = None;
    }

    /// Clears the writer and binds it to a new sink.
    pub fn reset_sink<W: Write + 'w>(&mut self, sink: W) {
        self.reset();
        self.sink = Some(Box::new(sink));
    }

    /// Clears the writer and returns it to in-memory mode.
    pub fn detach(&mut self) {
        self.reset();
        self.sink = None;
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Total bytes produced since the last reset, flushed or not.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.flushed + self.buf.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Takes the buffer out, leaving the writer empty.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Copies the buffered bytes to `stream` and clears the buffer.
    pub fn to_stream<S: Write + ?Sized>(&mut self, stream: &mut S) -> Result<()> {
        stream.write_all(&self.buf)?;
        self.flushed += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }

    /// Hands residual bytes to the sink and flushes it.
    ///
    /// Reports the first sink failure seen since the last reset.
    pub fn flush(&mut self) -> Result<()> {
        self.drain();
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    fn drain(&mut self) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if self.buf.is_empty() || self.failure.is_some() {
            return;
        }
        match sink.write_all(&self.buf) {
            Ok(()) => {
                self.flushed += self.buf.len() as u64;
                self.buf.clear();
            }
            Err(e) => self.failure = Some(Error::io(&e)),
        }
    }

    #[inline]
    fn written(&mut self) {
        if self.sink.is_some() && self.buf.len() >= self.options.flush_threshold {
            self.drain();
        }
    }

    /// Writes one raw byte, typically punctuation.
    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        self.buf.push(b);
        self.written();
    }

    /// Writes bytes that are already valid JSON.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.written();
    }

    /// Writes `bytes` as a quoted standard base64 string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Writer;
    ///
    /// let mut writer = Writer::new();
    /// writer.write_binary(b"hi!").unwrap();
    /// assert_eq!(writer.as_bytes(), b"\"aGkh\"");
    /// ```
    pub fn write_binary(&mut self, bytes: &[u8]) -> Result<()> {
        let at = self.size();
        let size = base64::encoded_len(bytes.len(), true)
            .ok_or_else(|| Error::limit_exceeded(at, "binary value too large"))?;
        self.buf.push(b'"');
        let start = self.buf.len();
        self.buf.resize(start + size, 0);
        let written = BASE64_STANDARD
            .encode_slice(bytes, &mut self.buf[start..])
            .map_err(|_| Error::limit_exceeded(at, "binary value too large"))?;
        self.buf.truncate(start + written);
        self.buf.push(b'"');
        self.written();
        Ok(())
    }

    /// Writes a fixed ASCII literal such as `true` or `":"`.
    #[inline]
    pub fn write_ascii(&mut self, literal: &str) {
        self.write_raw(literal.as_bytes());
    }

    #[inline]
    pub fn write_null(&mut self) {
        self.write_raw(b"null");
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_raw(if value { b"true" } else { b"false" });
    }

    /// Writes `s` as a quoted, escaped string.
    pub fn write_string(&mut self, s: &str) {
        text::write_escaped(&mut self.buf, s);
        self.written();
    }

    /// Writes an object key followed by `:`.
    pub fn write_key(&mut self, key: &str) {
        text::write_escaped(&mut self.buf, key);
        self.buf.push(b':');
        self.written();
    }

    /// Writes an integer of any supported width.
    #[inline]
    pub fn write_int<T: JsonInt>(&mut self, value: T) {
        self.buf.reserve(40);
        number::write_int(&mut self.buf, value);
        self.written();
    }

    /// Writes a double as its shortest round-trip text.
    ///
    /// `NaN` and the infinities follow [`Options::non_finite`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::{NonFinitePolicy, Options, Writer};
    ///
    /// let mut writer = Writer::new();
    /// assert!(writer.write_f64(f64::NAN).is_err());
    ///
    /// let options = Options::new().with_non_finite(NonFinitePolicy::Quoted);
    /// let mut writer = Writer::with_options(&options);
    /// writer.write_f64(f64::NEG_INFINITY).unwrap();
    /// assert_eq!(writer.as_bytes(), b"\"-Infinity\"");
    /// ```
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return self.write_non_finite(value);
        }
        self.buf.reserve(24);
        number::write_f64(&mut self.buf, value);
        self.written();
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() {
            return self.write_non_finite(f64::from(value));
        }
        self.buf.reserve(16);
        number::write_f32(&mut self.buf, value);
        self.written();
        Ok(())
    }

    fn write_non_finite(&mut self, value: f64) -> Result<()> {
        let name = number::non_finite_text(value);
        match self.options.non_finite {
            NonFinitePolicy::Error => Err(Error::NonFiniteNumber(name.to_string())),
            NonFinitePolicy::Null => {
                self.write_null();
                Ok(())
            }
            NonFinitePolicy::Quoted => {
                self.write_string(name);
                Ok(())
            }
        }
    }

    /// Writes a decimal in canonical form, digit for digit.
    pub fn write_decimal(&mut self, value: &Decimal) {
        value.write_canonical(&mut self.buf);
        self.written();
    }

    /// Writes an arbitrary-precision integer.
    pub fn write_bigint(&mut self, value: &BigInt) {
        match i128::try_from(value) {
            Ok(small) => self.write_int(small),
            Err(_) => {
                if value.sign() == Sign::Minus {
                    self.buf.push(b'-');
                }
                let digits = value.magnitude().to_radix_be(10);
                self.buf.extend(digits.into_iter().map(|d| d + b'0'));
                self.written();
            }
        }
    }

    pub fn write_number(&mut self, value: &Number) -> Result<()> {
        match value {
            Number::Integer(v) => {
                self.write_int(*v);
                Ok(())
            }
            Number::Float(v) => self.write_f64(*v),
            Number::Decimal(d) => {
                self.write_decimal(d);
                Ok(())
            }
        }
    }
}
