//! String escaping, unescaping and object-key hashing.
//!
//! Writers copy runs of bytes that need no escaping straight into the output
//! and only stop at quotes, backslashes and control characters. Non-ASCII
//! text is emitted as raw UTF-8, never as `\u` sequences.

use crate::error::{Error, Result};

const __: u8 = 0;
const UU: u8 = b'u';

/// Escape letter for each byte, or 0 when the byte is copied as is.
static ESCAPE: [u8; 256] = {
    let mut table = [__; 256];
    let mut i = 0;
    while i < 0x20 {
        table[i] = UU;
        i += 1;
    }
    table[0x08] = b'b';
    table[0x09] = b't';
    table[0x0a] = b'n';
    table[0x0c] = b'f';
    table[0x0d] = b'r';
    table[b'"' as usize] = b'"';
    table[b'\\' as usize] = b'\\';
    table
};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Length of the quoted, escaped form of `s` including both quotes.
#[must_use]
pub fn escaped_len(s: &str) -> usize {
    let mut len = 2;
    for &b in s.as_bytes() {
        len += match ESCAPE[b as usize] {
            __ => 1,
            UU => 6,
            _ => 2,
        };
    }
    len
}

/// Appends `s` as a quoted JSON string.
///
/// # Examples
///
/// ```rust
/// use jsonbind::text;
///
/// let mut out = Vec::new();
/// text::write_escaped(&mut out, "tab\there \"ü\"\u{1}");
/// assert_eq!(out, "\"tab\\there \\\"ü\\\"\\u0001\"".as_bytes());
/// ```
pub fn write_escaped(out: &mut Vec<u8>, s: &str) {
    out.reserve(escaped_len(s));
    out.push(b'"');
    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let escape = ESCAPE[b as usize];
        if escape == __ {
            continue;
        }
        if start < i {
            out.extend_from_slice(&bytes[start..i]);
        }
        if escape == UU {
            out.extend_from_slice(&[
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX[(b >> 4) as usize],
                HEX[(b & 0xf) as usize],
            ]);
        } else {
            out.extend_from_slice(&[b'\\', escape]);
        }
        start = i + 1;
    }
    if start < bytes.len() {
        out.extend_from_slice(&bytes[start..]);
    }
    out.push(b'"');
}

/// Returns `true` when `s` can be written between quotes unchanged.
#[inline]
#[must_use]
pub fn needs_no_escape(s: &str) -> bool {
    s.as_bytes().iter().all(|&b| ESCAPE[b as usize] == __)
}

/// Result of decoding one escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Escape {
    Byte(u8),
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeError {
    /// More input is needed to finish the sequence.
    Incomplete,
    Invalid(&'static str),
}

/// Bytes an escape can span after its backslash: `u` + 4 hex + `\u` + 4 hex.
pub(crate) const MAX_ESCAPE_LEN: usize = 11;

/// Incomplete only while every available byte is still a hex digit.
fn hex4(input: &[u8]) -> std::result::Result<u16, EscapeError> {
    let mut value = 0u16;
    for i in 0..4 {
        let Some(&b) = input.get(i) else {
            return Err(EscapeError::Incomplete);
        };
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => return Err(EscapeError::Invalid("invalid hex digit in \\u escape")),
        };
        value = (value << 4) | u16::from(digit);
    }
    Ok(value)
}

/// Decodes the escape whose body starts at `input[0]` (the byte after `\`).
///
/// Returns the number of bytes consumed from `input`.
pub(crate) fn decode_escape(input: &[u8]) -> std::result::Result<(usize, Escape), EscapeError> {
    let first = *input.first().ok_or(EscapeError::Incomplete)?;
    let byte = match first {
        b'"' => b'"',
        b'\\' => b'\\',
        b'/' => b'/',
        b'b' => 0x08,
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'u' => {
            let unit = hex4(&input[1..])?;
            return match unit {
                0xD800..=0xDBFF => {
                    let rest = &input[5..];
                    match rest {
                        [] | [b'\\'] => return Err(EscapeError::Incomplete),
                        [b'\\', b'u', ..] => {}
                        _ => return Err(EscapeError::Invalid("unpaired high surrogate")),
                    }
                    let low = hex4(&rest[2..])?;
                    if !(0xDC00..=0xDFFF).contains(&low) {
                        return Err(EscapeError::Invalid("unpaired high surrogate"));
                    }
                    let code = 0x10000
                        + ((u32::from(unit) - 0xD800) << 10)
                        + (u32::from(low) - 0xDC00);
                    char::from_u32(code)
                        .map(|c| (MAX_ESCAPE_LEN, Escape::Char(c)))
                        .ok_or(EscapeError::Invalid("invalid code point"))
                }
                0xDC00..=0xDFFF => Err(EscapeError::Invalid("unpaired low surrogate")),
                _ => char::from_u32(u32::from(unit))
                    .map(|c| (5, Escape::Char(c)))
                    .ok_or(EscapeError::Invalid("invalid code point")),
            };
        }
        _ => return Err(EscapeError::Invalid("invalid escape character")),
    };
    Ok((1, Escape::Byte(byte)))
}

/// Appends a decoded escape to `out` as UTF-8.
pub(crate) fn push_escape(out: &mut Vec<u8>, escape: Escape) {
    match escape {
        Escape::Byte(b) => out.push(b),
        Escape::Char(c) => {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
}

/// Unescapes the body of a JSON string (without its quotes).
///
/// # Examples
///
/// ```rust
/// use jsonbind::text;
///
/// assert_eq!(text::unescape(br"a\nb\u00e9\ud83d\ude00").unwrap(), "a\nbé😀");
/// assert!(text::unescape(br"\ud83d").is_err());
/// ```
pub fn unescape(body: &[u8]) -> Result<String> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        match memchr::memchr(b'\\', &body[i..]) {
            None => {
                out.extend_from_slice(&body[i..]);
                break;
            }
            Some(p) => {
                out.extend_from_slice(&body[i..i + p]);
                i += p + 1;
                let (used, escape) = decode_escape(&body[i..]).map_err(|e| match e {
                    EscapeError::Incomplete => Error::invalid_escape(i as u64, "truncated escape"),
                    EscapeError::Invalid(msg) => Error::invalid_escape(i as u64, msg),
                })?;
                push_escape(&mut out, escape);
                i += used;
            }
        }
    }
    String::from_utf8(out).map_err(|e| Error::InvalidUtf8 {
        offset: e.utf8_error().valid_up_to() as u64,
    })
}

/// FNV-1a hash of an object key, used for field dispatch.
///
/// # Examples
///
/// ```rust
/// use jsonbind::text::name_hash;
///
/// assert_eq!(name_hash(b""), 0x811c_9dc5);
/// assert_ne!(name_hash(b"id"), name_hash(b"di"));
/// ```
#[inline]
#[must_use]
pub const fn name_hash(name: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    let mut i = 0;
    while i < name.len() {
        hash ^= name[i] as u32;
        hash = hash.wrapping_mul(0x0100_0193);
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &str) -> String {
        let mut out = Vec::new();
        write_escaped(&mut out, s);
        assert_eq!(out.len(), escaped_len(s));
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn ascii_fast_path() {
        assert_eq!(escaped("Hello World!"), "\"Hello World!\"");
        assert!(needs_no_escape("Hello World!"));
        assert!(!needs_no_escape("a\"b"));
    }

    #[test]
    fn control_characters() {
        assert_eq!(escaped("\u{8}\u{c}\n\r\t"), r#""\b\f\n\r\t""#);
        assert_eq!(escaped("\u{0}\u{1f}"), r#""\u0000\u001f""#);
        assert_eq!(escaped("/"), "\"/\"");
    }

    #[test]
    fn non_ascii_is_raw() {
        assert_eq!(escaped("日本"), "\"日本\"");
    }

    #[test]
    fn surrogates() {
        assert_eq!(
            decode_escape(br"ud83d\ude00").unwrap(),
            (11, Escape::Char('😀'))
        );
        assert_eq!(
            decode_escape(br"udc00"),
            Err(EscapeError::Invalid("unpaired low surrogate"))
        );
        assert_eq!(decode_escape(br"ud83d\"), Err(EscapeError::Incomplete));
        assert_eq!(decode_escape(b"u12"), Err(EscapeError::Incomplete));
        assert!(matches!(decode_escape(b"u12\""), Err(EscapeError::Invalid(_))));
        assert_eq!(decode_escape(b"ud83d"), Err(EscapeError::Incomplete));
        assert!(matches!(decode_escape(b"ud83d\""), Err(EscapeError::Invalid(_))));
        assert!(matches!(decode_escape(b"ud83d\\n"), Err(EscapeError::Invalid(_))));
        assert!(matches!(decode_escape(b"x"), Err(EscapeError::Invalid(_))));
    }

    #[test]
    fn fnv_reference_values() {
        assert_eq!(name_hash(b"a"), 0xe40c_292c);
        assert_eq!(name_hash(b"foobar"), 0xbf9c_f968);
    }
}
