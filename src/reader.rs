//! Pull-based JSON tokenizer.
//!
//! A [`Reader`] walks a byte source one significant byte at a time.
//! [`Reader::advance`] skips whitespace and consumes the next byte, which is
//! then available from [`Reader::last`]; scalar reads start at that byte.
//! Callers drive the structure themselves:
//!
//! ```rust
//! use jsonbind::Reader;
//!
//! let mut reader = Reader::from_slice(br#"{"id": 7, "tags": ["a"]}"#);
//! assert_eq!(reader.advance().unwrap(), b'{');
//! reader.advance().unwrap();
//! let hash = reader.fill_name().unwrap();
//! assert_eq!(hash, jsonbind::text::name_hash(b"id"));
//! reader.advance().unwrap();
//! assert_eq!(reader.read_int::<u32>().unwrap(), 7);
//! assert_eq!(reader.advance().unwrap(), b',');
//! ```
//!
//! ## Sources
//!
//! Slice readers see the whole input at once. Stream readers own a buffer
//! that is refilled from an [`std::io::Read`]; on refill, unread bytes are
//! moved to the front and the buffer doubles when a single token does not
//! fit, up to [`Options::max_buffer_size`]. Strings that cross a refill are
//! accumulated in a scratch area, so results never depend on where the
//! source splits its chunks.

use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::number::{self, JsonInt, Number, NumberKind};
use crate::options::Options;
use crate::text::{self, EscapeError};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use std::io::{self, Read};

enum Input<'a> {
    Slice(&'a [u8]),
    Stream {
        buf: Vec<u8>,
        source: Box<dyn Read + 'a>,
        eof: bool,
    },
}

/// Where the last string read landed.
#[derive(Clone, Copy)]
enum StrLoc {
    Window(usize, usize),
    Scratch,
}

#[inline]
fn window_of<'b>(input: &'b Input<'_>, len: usize) -> &'b [u8] {
    match input {
        Input::Slice(bytes) => bytes,
        Input::Stream { buf, .. } => &buf[..len],
    }
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[inline]
fn is_string_stop(b: u8) -> bool {
    b == b'"' || b == b'\\' || b < 0x20
}

/// Streaming JSON reader over a slice or an [`io::Read`] source.
pub struct Reader<'a> {
    input: Input<'a>,
    pos: usize,
    len: usize,
    /// Absolute offset of window byte 0.
    offset: u64,
    token: u8,
    scratch: Vec<u8>,
    name: Vec<u8>,
    last_hash: u32,
    depth: usize,
    options: Options,
}

impl<'a> Reader<'a> {
    /// Creates a reader over a complete input with default options.
    #[must_use]
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::with_options(bytes, &Options::default())
    }

    #[must_use]
    pub fn with_options(bytes: &'a [u8], options: &Options) -> Self {
        Reader {
            input: Input::Slice(bytes),
            pos: 0,
            len: bytes.len(),
            offset: 0,
            token: 0,
            scratch: Vec::new(),
            name: Vec::new(),
            last_hash: 0,
            depth: 0,
            options: options.clone(),
        }
    }

    /// Creates a reader that refills from `source`, starting with a buffer of
    /// [`Options::buffer_size`] bytes.
    pub fn from_stream<R: Read + 'a>(source: R, options: &Options) -> Self {
        Self::from_stream_with_buffer(source, Vec::new(), options)
    }

    /// Like [`Reader::from_stream`] but reuses `buffer`'s allocation.
    pub fn from_stream_with_buffer<R: Read + 'a>(
        source: R,
        mut buffer: Vec<u8>,
        options: &Options,
    ) -> Self {
        let size = options.buffer_size.max(1);
        buffer.clear();
        buffer.resize(size, 0);
        Reader {
            input: Input::Stream {
                buf: buffer,
                source: Box::new(source),
                eof: false,
            },
            pos: 0,
            len: 0,
            offset: 0,
            token: 0,
            scratch: Vec::new(),
            name: Vec::new(),
            last_hash: 0,
            depth: 0,
            options: options.clone(),
        }
    }

    /// Points the reader at a new complete input, keeping its scratch space.
    pub fn reset_slice(&mut self, bytes: &'a [u8]) {
        self.input = Input::Slice(bytes);
        self.pos = 0;
        self.len = bytes.len();
        self.offset = 0;
        self.token = 0;
        self.last_hash = 0;
        self.depth = 0;
    }

    /// Returns the stream buffer, if any, for reuse.
    #[must_use]
    pub fn into_buffer(self) -> Option<Vec<u8>> {
        match self.input {
            Input::Slice(_) => None,
            Input::Stream { buf, .. } => Some(buf),
        }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The last significant byte consumed by [`Reader::advance`].
    #[inline]
    #[must_use]
    pub fn last(&self) -> u8 {
        self.token
    }

    /// Absolute offset of the next unread byte.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset + self.pos as u64
    }

    #[inline]
    fn token_offset(&self) -> u64 {
        self.position().saturating_sub(1)
    }

    #[inline]
    fn window(&self) -> &[u8] {
        window_of(&self.input, self.len)
    }

    /// Error for the current token not being what the caller wanted.
    #[must_use]
    pub fn unexpected(&self, expected: &str) -> Error {
        Error::invalid_token(self.token_offset(), expected, self.token)
    }

    /// Moves `[keep, len)` to the front of the stream buffer, grows it when
    /// full and reads more bytes. Returns the number of bytes read.
    fn refill(&mut self, keep: usize) -> Result<usize> {
        let Input::Stream { buf, source, eof } = &mut self.input else {
            return Ok(0);
        };
        if *eof {
            return Ok(0);
        }
        if keep > 0 {
            buf.copy_within(keep..self.len, 0);
            self.len -= keep;
            self.pos -= keep;
            self.offset += keep as u64;
        }
        if self.len == buf.len() {
            let grown = (buf.len() * 2).min(self.options.max_buffer_size);
            if grown <= buf.len() {
                return Err(Error::limit_exceeded(
                    self.offset + self.len as u64,
                    "token exceeds maximum buffer size",
                ));
            }
            tracing::trace!(from = buf.len(), to = grown, "growing reader buffer");
            buf.resize(grown, 0);
        }
        loop {
            match source.read(&mut buf[self.len..]) {
                Ok(0) => {
                    *eof = true;
                    return Ok(0);
                }
                Ok(n) => {
                    tracing::trace!(bytes = n, offset = self.offset, "refilled reader buffer");
                    self.len += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(&e)),
            }
        }
    }

    /// Makes at least `n` unread bytes available if the source has them.
    fn ensure(&mut self, n: usize) -> Result<bool> {
        while self.len - self.pos < n {
            if self.refill(self.pos)? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Skips whitespace and consumes the next significant byte.
    ///
    /// Fails with [`Error::UnexpectedEnd`] when the input is exhausted.
    #[inline]
    pub fn advance(&mut self) -> Result<u8> {
        loop {
            while self.pos < self.len {
                let b = self.window()[self.pos];
                self.pos += 1;
                if !is_whitespace(b) {
                    self.token = b;
                    return Ok(b);
                }
            }
            if self.refill(self.pos)? == 0 {
                return Err(Error::unexpected_end(self.position(), "value"));
            }
        }
    }

    /// Requires the current token to be `byte`.
    #[inline]
    pub fn check(&self, byte: u8) -> Result<()> {
        if self.token == byte {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", byte as char)))
        }
    }

    /// Advances and requires the new token to be `byte`.
    #[inline]
    pub fn expect(&mut self, byte: u8) -> Result<()> {
        self.advance()?;
        self.check(byte)
    }

    /// Returns `true` if only whitespace remains.
    pub fn at_end(&mut self) -> Result<bool> {
        loop {
            while self.pos < self.len {
                if !is_whitespace(self.window()[self.pos]) {
                    return Ok(false);
                }
                self.pos += 1;
            }
            if self.refill(self.pos)? == 0 {
                return Ok(true);
            }
        }
    }

    /// Fails unless only whitespace remains.
    pub fn finish(&mut self) -> Result<()> {
        if self.at_end()? {
            Ok(())
        } else {
            let b = self.window()[self.pos];
            Err(Error::invalid_token(self.position(), "end of input", b))
        }
    }

    /// Enters one nesting level, failing past [`Options::max_depth`].
    pub fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(Error::limit_exceeded(
                self.token_offset(),
                "maximum nesting depth exceeded",
            ));
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    // ---- strings -------------------------------------------------------

    fn read_str_loc(&mut self) -> Result<StrLoc> {
        if self.token != b'"' {
            return Err(self.unexpected("string"));
        }
        let start = self.pos;
        let stop = self.window()[start..]
            .iter()
            .position(|&b| is_string_stop(b))
            .map(|p| start + p);
        if let Some(end) = stop {
            if self.window()[end] == b'"' {
                self.pos = end + 1;
                return Ok(StrLoc::Window(start, end));
            }
        }

        let run_end = stop.unwrap_or(self.len);
        self.scratch.clear();
        self.scratch
            .extend_from_slice(&window_of(&self.input, self.len)[start..run_end]);
        self.pos = run_end;
        loop {
            let window = window_of(&self.input, self.len);
            let rest = &window[self.pos..];
            match rest.iter().position(|&b| is_string_stop(b)) {
                None => {
                    self.scratch.extend_from_slice(rest);
                    self.pos = self.len;
                    if self.refill(self.pos)? == 0 {
                        return Err(Error::unexpected_end(self.position(), "closing '\"'"));
                    }
                }
                Some(p) => {
                    self.scratch.extend_from_slice(&rest[..p]);
                    self.pos += p;
                    let b = rest[p];
                    self.pos += 1;
                    match b {
                        b'"' => return Ok(StrLoc::Scratch),
                        b'\\' => self.read_escape()?,
                        _ => {
                            return Err(Error::invalid_token(
                                self.position() - 1,
                                "string character",
                                b,
                            ))
                        }
                    }
                }
            }
        }
    }

    fn read_escape(&mut self) -> Result<()> {
        self.ensure(text::MAX_ESCAPE_LEN)?;
        let at = self.position() - 1;
        let body = &window_of(&self.input, self.len)[self.pos..];
        match text::decode_escape(body) {
            Ok((used, escape)) => {
                text::push_escape(&mut self.scratch, escape);
                self.pos += used;
                Ok(())
            }
            Err(EscapeError::Incomplete) => Err(Error::unexpected_end(
                self.offset + self.len as u64,
                "escape sequence",
            )),
            Err(EscapeError::Invalid(msg)) => Err(Error::invalid_escape(at, msg)),
        }
    }

    fn loc_bytes(&self, loc: StrLoc) -> &[u8] {
        match loc {
            StrLoc::Window(s, e) => &self.window()[s..e],
            StrLoc::Scratch => &self.scratch,
        }
    }

    /// Reads the string at the current `"` token into reader-owned storage.
    ///
    /// The result is valid until the next read.
    pub fn read_str(&mut self) -> Result<&str> {
        let start = self.token_offset() + 1;
        let loc = self.read_str_loc()?;
        std::str::from_utf8(self.loc_bytes(loc)).map_err(|e| Error::InvalidUtf8 {
            offset: start + e.valid_up_to() as u64,
        })
    }

    /// Reads the string at the current `"` token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Reader;
    ///
    /// let mut reader = Reader::from_slice(br#""Hello\nWorld!""#);
    /// reader.advance().unwrap();
    /// assert_eq!(reader.read_string().unwrap(), "Hello\nWorld!");
    /// ```
    pub fn read_string(&mut self) -> Result<String> {
        self.read_str().map(str::to_owned)
    }

    /// Reads a standard base64 string at the current `"` token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Reader;
    ///
    /// let mut reader = Reader::from_slice(br#""aGkh""#);
    /// reader.advance().unwrap();
    /// assert_eq!(reader.read_base64().unwrap(), b"hi!");
    /// ```
    pub fn read_base64(&mut self) -> Result<Vec<u8>> {
        let start = self.token_offset() + 1;
        let loc = self.read_str_loc()?;
        BASE64_STANDARD
            .decode(self.loc_bytes(loc))
            .map_err(|e| {
                let at = match &e {
                    base64::DecodeError::InvalidByte(i, _)
                    | base64::DecodeError::InvalidLastSymbol(i, _) => start + *i as u64,
                    _ => start,
                };
                Error::InvalidToken {
                    offset: at,
                    expected: "base64 string".to_string(),
                    found: e.to_string(),
                }
            })
    }

    /// Reads an object key at the current `"` token, consumes the `:` after
    /// it and returns the key's FNV-1a hash.
    ///
    /// The key stays available through [`Reader::last_name`]. The value is
    /// not touched; call [`Reader::advance`] to reach it.
    pub fn fill_name(&mut self) -> Result<u32> {
        let start = self.token_offset() + 1;
        let loc = self.read_str_loc()?;
        let src = match loc {
            StrLoc::Window(s, e) => &window_of(&self.input, self.len)[s..e],
            StrLoc::Scratch => &self.scratch[..],
        };
        self.name.clear();
        self.name.extend_from_slice(src);
        if let Err(e) = std::str::from_utf8(&self.name) {
            return Err(Error::InvalidUtf8 {
                offset: start + e.valid_up_to() as u64,
            });
        }
        self.last_hash = text::name_hash(&self.name);
        if self.advance()? != b':' {
            return Err(self.unexpected("':'"));
        }
        Ok(self.last_hash)
    }

    /// Reads an object key, consumes the `:` and advances to the value.
    pub fn read_key(&mut self) -> Result<&str> {
        self.fill_name()?;
        self.advance()?;
        Ok(self.last_name())
    }

    /// The key read by the last [`Reader::fill_name`] or [`Reader::read_key`].
    #[must_use]
    pub fn last_name(&self) -> &str {
        std::str::from_utf8(&self.name).unwrap_or_default()
    }

    #[must_use]
    pub fn was_last_name(&self, name: &[u8]) -> bool {
        self.name == name
    }

    #[must_use]
    pub fn last_hash(&self) -> u32 {
        self.last_hash
    }

    // ---- literals ------------------------------------------------------

    fn literal(&mut self, rest: &'static [u8], name: &str) -> Result<()> {
        self.ensure(rest.len())?;
        let at = self.position();
        let window = &self.window()[self.pos..];
        for (i, &want) in rest.iter().enumerate() {
            match window.get(i) {
                Some(&b) if b == want => {}
                Some(&b) => return Err(Error::invalid_token(at + i as u64, name, b)),
                None => return Err(Error::unexpected_end(at + i as u64, name)),
            }
        }
        self.pos += rest.len();
        Ok(())
    }

    /// Consumes `null` if the current token starts it.
    #[inline]
    pub fn was_null(&mut self) -> Result<bool> {
        if self.token != b'n' {
            return Ok(false);
        }
        self.literal(b"ull", "'null'")?;
        Ok(true)
    }

    /// Consumes `true` if the current token starts it.
    #[inline]
    pub fn was_true(&mut self) -> Result<bool> {
        if self.token != b't' {
            return Ok(false);
        }
        self.literal(b"rue", "'true'")?;
        Ok(true)
    }

    /// Consumes `false` if the current token starts it.
    #[inline]
    pub fn was_false(&mut self) -> Result<bool> {
        if self.token != b'f' {
            return Ok(false);
        }
        self.literal(b"alse", "'false'")?;
        Ok(true)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        if self.was_true()? {
            Ok(true)
        } else if self.was_false()? {
            Ok(false)
        } else {
            Err(self.unexpected("boolean"))
        }
    }

    // ---- numbers -------------------------------------------------------

    /// Finds the extent of the number starting at the current token.
    fn scan_number(&mut self) -> Result<(usize, usize)> {
        if !matches!(self.token, b'-' | b'0'..=b'9') {
            return Err(self.unexpected("number"));
        }
        let mut start = self.pos - 1;
        let mut end = self.pos;
        loop {
            let window = self.window();
            while end < window.len() && number::is_number_byte(window[end]) {
                end += 1;
            }
            if end < self.len {
                break;
            }
            let before = self.offset;
            let read = self.refill(start)?;
            let shift = (self.offset - before) as usize;
            start -= shift;
            end -= shift;
            if read == 0 {
                break;
            }
        }
        self.pos = end;
        Ok((start, end))
    }

    /// Reads an integer of type `T`; see [`number::parse_int`].
    pub fn read_int<T: JsonInt>(&mut self) -> Result<T> {
        let (s, e) = self.scan_number()?;
        number::parse_int_at(&self.window()[s..e], self.offset + s as u64)
    }

    /// Reads a double. Quoted numbers and the quoted names `"NaN"`,
    /// `"Infinity"` and `"-Infinity"` are accepted.
    pub fn read_f64(&mut self) -> Result<f64> {
        if self.token == b'"' {
            let at = self.token_offset();
            return match self.read_str()? {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                quoted => number::parse_f64_at(quoted.as_bytes(), at + 1),
            };
        }
        let (s, e) = self.scan_number()?;
        number::parse_f64_at(&self.window()[s..e], self.offset + s as u64)
    }

    /// Reads a float; accepts the same quoted forms as [`Reader::read_f64`].
    pub fn read_f32(&mut self) -> Result<f32> {
        if self.token == b'"' {
            let at = self.token_offset();
            return match self.read_str()? {
                "NaN" => Ok(f32::NAN),
                "Infinity" => Ok(f32::INFINITY),
                "-Infinity" => Ok(f32::NEG_INFINITY),
                quoted => number::parse_f32_at(quoted.as_bytes(), at + 1),
            };
        }
        let (s, e) = self.scan_number()?;
        number::parse_f32_at(&self.window()[s..e], self.offset + s as u64)
    }

    /// Reads an exact decimal; a quoted number is also accepted.
    pub fn read_decimal(&mut self) -> Result<Decimal> {
        if self.token == b'"' {
            let at = self.token_offset();
            let quoted = self.read_str()?;
            return Decimal::parse_at(quoted.as_bytes(), at + 1);
        }
        let (s, e) = self.scan_number()?;
        Decimal::parse_at(&self.window()[s..e], self.offset + s as u64)
    }

    /// Reads the number at the current token as `kind`.
    pub fn read_number(&mut self, kind: NumberKind) -> Result<Number> {
        let (s, e) = self.scan_number()?;
        number::parse_number_at(&self.window()[s..e], kind, self.offset + s as u64)
    }

    // ---- structure -----------------------------------------------------

    /// Reads the array at the current `[` token, calling `item` with the
    /// reader positioned on each element's first byte.
    pub fn read_array<F>(&mut self, mut item: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        self.check(b'[')?;
        self.enter()?;
        if self.advance()? != b']' {
            loop {
                item(self)?;
                match self.advance()? {
                    b',' => {
                        self.advance()?;
                    }
                    b']' => break,
                    _ => return Err(self.unexpected("',' or ']'")),
                }
            }
        }
        self.leave();
        Ok(())
    }

    /// Reads the object at the current `{` token, calling `entry` with each
    /// key and the reader positioned on the value's first byte.
    pub fn read_object<F>(&mut self, mut entry: F) -> Result<()>
    where
        F: FnMut(&mut Self, String) -> Result<()>,
    {
        self.check(b'{')?;
        self.enter()?;
        if self.advance()? != b'}' {
            loop {
                if self.token != b'"' {
                    return Err(self.unexpected("object key"));
                }
                let key = self.read_key()?.to_owned();
                entry(self, key)?;
                match self.advance()? {
                    b',' => {
                        self.advance()?;
                    }
                    b'}' => break,
                    _ => return Err(self.unexpected("',' or '}'")),
                }
            }
        }
        self.leave();
        Ok(())
    }

    /// Consumes one complete value starting at the current token without
    /// materializing it. Afterwards [`Reader::last`] is the value's final
    /// significant byte, as after reading it.
    pub fn skip_value(&mut self) -> Result<()> {
        let mut closers: Vec<u8> = Vec::new();
        loop {
            match self.token {
                b'{' => {
                    if self.advance()? != b'}' {
                        closers.push(b'}');
                        self.check_skip_depth(closers.len())?;
                        self.skip_member_name()?;
                        continue;
                    }
                }
                b'[' => {
                    if self.advance()? != b']' {
                        closers.push(b']');
                        self.check_skip_depth(closers.len())?;
                        continue;
                    }
                }
                b'"' => {
                    self.read_str_loc()?;
                }
                b't' => self.literal(b"rue", "'true'")?,
                b'f' => self.literal(b"alse", "'false'")?,
                b'n' => self.literal(b"ull", "'null'")?,
                b'-' | b'0'..=b'9' => {
                    let (s, e) = self.scan_number()?;
                    number::parse_parts(&self.window()[s..e]).map_err(|msg| {
                        Error::invalid_number(self.offset + s as u64, msg)
                    })?;
                }
                _ => return Err(self.unexpected("value")),
            }
            loop {
                let Some(&closer) = closers.last() else {
                    return Ok(());
                };
                match self.advance()? {
                    b',' => {
                        self.advance()?;
                        if closer == b'}' {
                            self.skip_member_name()?;
                        }
                        break;
                    }
                    b if b == closer => {
                        closers.pop();
                    }
                    _ => {
                        return Err(self.unexpected(if closer == b'}' {
                            "',' or '}'"
                        } else {
                            "',' or ']'"
                        }))
                    }
                }
            }
        }
    }

    fn check_skip_depth(&self, depth: usize) -> Result<()> {
        if self.depth + depth > self.options.max_depth {
            return Err(Error::limit_exceeded(
                self.token_offset(),
                "maximum nesting depth exceeded",
            ));
        }
        Ok(())
    }

    fn skip_member_name(&mut self) -> Result<()> {
        if self.token != b'"' {
            return Err(self.unexpected("object key"));
        }
        self.read_str_loc()?;
        self.expect(b':')?;
        self.advance()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Yields its input `chunk` bytes at a time.
    struct Chunked<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Chunked<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn stream(data: &[u8], buffer: usize) -> Reader<'_> {
        Reader::from_stream(
            Chunked { data, chunk: 3 },
            &Options::new().with_buffer_size(buffer),
        )
    }

    #[test]
    fn advance_skips_whitespace() {
        let mut reader = Reader::from_slice(b" \n\t[ ]");
        assert_eq!(reader.advance().unwrap(), b'[');
        assert_eq!(reader.advance().unwrap(), b']');
        let err = reader.advance().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEnd);
        assert_eq!(err.offset(), Some(6));
    }

    #[test]
    fn string_spanning_refills() {
        let mut reader = stream(br#""abcdefgh""#, 4);
        reader.advance().unwrap();
        assert_eq!(reader.read_str().unwrap(), "abcdefgh");
        assert!(reader.at_end().unwrap());
    }

    #[test]
    fn escapes_across_refills() {
        let input = "\"x😀yé\\\"\"".as_bytes();
        let mut reader = stream(input, 1);
        reader.advance().unwrap();
        assert_eq!(reader.read_str().unwrap(), "x😀yé\"");
    }

    #[test]
    fn raw_control_characters_are_rejected() {
        let mut reader = Reader::from_slice(b"\"a\x01\"");
        reader.advance().unwrap();
        assert_eq!(
            reader.read_str().unwrap_err().kind(),
            ErrorKind::InvalidToken
        );
    }

    #[test]
    fn malformed_escapes() {
        for (input, offset) in [
            (&br#""\x""#[..], 1),
            (&br#""ab\ud83d""#[..], 3),
            (&br#""\udc00""#[..], 1),
            (&br#""\u12""#[..], 1),
            (&br#""\ud83d\n""#[..], 1),
        ] {
            for step in [1, input.len()] {
                let mut reader = stream(input, step);
                reader.advance().unwrap();
                let err = reader.read_str().unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidEscape, "{input:?}");
                assert_eq!(err.offset(), Some(offset), "{input:?}");
            }
        }
    }

    #[test]
    fn truncated_escapes_hit_the_end() {
        for input in [&br#""\u12"#[..], br#""\ud83d"#, br#""\"#] {
            let mut reader = stream(input, 1);
            reader.advance().unwrap();
            let err = reader.read_str().unwrap_err();
            assert!(err.is_eof(), "{input:?}");
            assert_eq!(err.offset(), Some(input.len() as u64));
        }
    }

    #[test]
    fn unterminated_string() {
        let mut reader = Reader::from_slice(b"\"abc");
        reader.advance().unwrap();
        assert!(reader.read_str().unwrap_err().is_eof());
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut reader = Reader::from_slice(b"\"a\xff\"");
        reader.advance().unwrap();
        let err = reader.read_str().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUtf8);
        assert_eq!(err.offset(), Some(2));
    }

    #[test]
    fn numbers_across_refills() {
        let mut reader = stream(b"[12345678901234, -0.000125, 3e2]", 2);
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert_eq!(reader.read_int::<i64>().unwrap(), 12_345_678_901_234);
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert_eq!(reader.read_f64().unwrap(), -0.000125);
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert_eq!(reader.read_int::<u16>().unwrap(), 300);
        assert_eq!(reader.advance().unwrap(), b']');
    }

    #[test]
    fn number_errors_carry_offsets() {
        let mut reader = Reader::from_slice(b"[1, 01]");
        reader.advance().unwrap();
        reader.advance().unwrap();
        reader.read_int::<i32>().unwrap();
        reader.advance().unwrap();
        reader.advance().unwrap();
        let err = reader.read_int::<i32>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidNumber);
        assert_eq!(err.offset(), Some(4));
    }

    #[test]
    fn quoted_floats() {
        let mut reader = Reader::from_slice(br#"["NaN","-Infinity","2.5"]"#);
        let mut values = Vec::new();
        reader.advance().unwrap();
        reader
            .read_array(|r| {
                values.push(r.read_f64()?);
                Ok(())
            })
            .unwrap();
        assert!(values[0].is_nan());
        assert_eq!(values[1], f64::NEG_INFINITY);
        assert_eq!(values[2], 2.5);
    }

    #[test]
    fn literals() {
        let mut reader = Reader::from_slice(b"[null,true,false,nul]");
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert!(!reader.was_true().unwrap());
        assert!(reader.was_null().unwrap());
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert!(reader.read_bool().unwrap());
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert!(reader.was_false().unwrap());
        reader.advance().unwrap();
        reader.advance().unwrap();
        assert_eq!(reader.was_null().unwrap_err().kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn fill_name_and_read_key() {
        let mut reader = Reader::from_slice(br#"{"name" : "x", "id": 1}"#);
        reader.advance().unwrap();
        reader.advance().unwrap();
        let hash = reader.fill_name().unwrap();
        assert_eq!(hash, text::name_hash(b"name"));
        assert!(reader.was_last_name(b"name"));
        assert_eq!(reader.last_hash(), hash);
        reader.advance().unwrap();
        reader.read_str().unwrap();
        reader.expect(b',').unwrap();
        reader.advance().unwrap();
        assert_eq!(reader.read_key().unwrap(), "id");
        assert_eq!(reader.last(), b'1');
    }

    #[test]
    fn missing_colon() {
        let mut reader = Reader::from_slice(br#"{"a" 1}"#);
        reader.advance().unwrap();
        reader.advance().unwrap();
        let err = reader.fill_name().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert!(err.to_string().contains("expected ':'"));
    }

    #[test]
    fn skip_value_lands_on_next_token() {
        let input = br#"[{"a":[1,{"b":null}],"c":"]}"}, 2.5e1, true, "s", 7]"#;
        let mut reader = Reader::from_slice(input);
        reader.advance().unwrap();
        reader.advance().unwrap();
        reader.skip_value().unwrap();
        assert_eq!(reader.last(), b'}');
        assert_eq!(reader.advance().unwrap(), b',');
        for _ in 0..3 {
            reader.advance().unwrap();
            reader.skip_value().unwrap();
            assert_eq!(reader.advance().unwrap(), b',');
        }
        reader.advance().unwrap();
        assert_eq!(reader.read_int::<u8>().unwrap(), 7);
    }

    #[test]
    fn skip_value_rejects_malformed_containers() {
        for bad in [&b"[1 2]"[..], b"{\"a\" 1}", b"{1:2}", b"[1,]", b"[-]"] {
            let mut reader = Reader::from_slice(bad);
            reader.advance().unwrap();
            assert!(reader.skip_value().is_err(), "{:?}", std::str::from_utf8(bad));
        }
    }

    #[test]
    fn skip_value_depth_limit() {
        let input = "[".repeat(10) + &"]".repeat(10);
        let mut reader =
            Reader::with_options(input.as_bytes(), &Options::new().with_max_depth(5));
        reader.advance().unwrap();
        assert_eq!(
            reader.skip_value().unwrap_err().kind(),
            ErrorKind::LimitExceeded
        );
    }

    #[test]
    fn buffer_ceiling() {
        let input = format!("\"{}\"", "x".repeat(100));
        let options = Options::new().with_buffer_size(4).with_max_buffer_size(16);
        let mut reader = Reader::from_stream(input.as_bytes(), &options);
        reader.advance().unwrap();
        // Strings go to scratch, so only numbers are bounded by the ceiling.
        assert_eq!(reader.read_str().unwrap().len(), 100);

        let digits = "1".repeat(40);
        let mut reader = Reader::from_stream(digits.as_bytes(), &options);
        reader.advance().unwrap();
        assert_eq!(
            reader.read_number(NumberKind::Decimal).unwrap_err().kind(),
            ErrorKind::LimitExceeded
        );
    }

    #[test]
    fn trailing_content() {
        let mut reader = Reader::from_slice(b"1 x");
        reader.advance().unwrap();
        reader.read_int::<i32>().unwrap();
        let err = reader.finish().unwrap_err();
        assert_eq!(err.offset(), Some(2));
    }
}
