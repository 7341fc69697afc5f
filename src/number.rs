//! Numeric codec.
//!
//! Strict JSON number grammar (no leading `+`, no leading zeros, digits
//! required after `.` and in exponents), integer parsing checked against the
//! target width, float parsing that yields the nearest IEEE-754 value and
//! float emission as the shortest text that reads back to the same bits.
//!
//! Emission goes through [`itoa`] and [`ryu`]; neither touches `fmt`.
//!
//! ```rust
//! use jsonbind::number;
//!
//! assert_eq!(number::parse_int::<u8>(b"2.55e2").unwrap(), 255);
//! assert!(number::parse_int::<u8>(b"256").is_err());
//! assert!(number::parse_int::<i32>(b"1.5").is_err());
//!
//! let mut out = Vec::new();
//! number::write_f64(&mut out, 0.1);
//! assert_eq!(out, b"0.1");
//! ```

use crate::decimal::Decimal;
use crate::error::{Error, Result};
use std::fmt;

/// Which numeric representation a read should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberKind {
    /// Exact `i64`; integral exponent forms are accepted.
    Integer,
    /// Nearest `f64`.
    Float,
    /// Exact [`Decimal`].
    Decimal,
    /// `i64` for integer text that fits, otherwise an exact [`Decimal`].
    Any,
}

/// A parsed JSON number.
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
}

impl Number {
    /// Returns the value as `i64` when it is integral and in range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Number;
    ///
    /// assert_eq!(Number::Integer(7).as_i64(), Some(7));
    /// assert_eq!(Number::Float(7.0).as_i64(), Some(7));
    /// assert_eq!(Number::Float(7.5).as_i64(), None);
    /// ```
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Integer(v) => Some(*v),
            Number::Float(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
            Number::Decimal(d) => d.to_i64(),
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(v) => *v as f64,
            Number::Float(v) => *v,
            Number::Decimal(d) => d.to_f64(),
        }
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(v) => f.write_str(itoa::Buffer::new().format(*v)),
            Number::Float(v) => f.write_str(ryu::Buffer::new().format(*v)),
            Number::Decimal(d) => fmt::Display::fmt(d, f),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Integer(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

impl From<Decimal> for Number {
    fn from(v: Decimal) -> Self {
        Number::Decimal(v)
    }
}

/// Integral types the codec reads and writes.
pub trait JsonInt: Copy + itoa::Integer + TryFrom<i128> + Send + Sync + 'static {
    const NAME: &'static str;
}

macro_rules! json_int {
    ($($t:ty),*) => {
        $(impl JsonInt for $t {
            const NAME: &'static str = stringify!($t);
        })*
    };
}

json_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

/// Borrowed pieces of a grammar-checked number.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NumberParts<'a> {
    pub negative: bool,
    pub int: &'a [u8],
    pub frac: &'a [u8],
    /// Exponent, saturated far outside any representable range.
    pub exp: i64,
    pub has_frac: bool,
    pub has_exp: bool,
}

const EXP_LIMIT: i64 = 1 << 40;

/// Bytes that may continue a number token.
#[inline]
pub(crate) fn is_number_byte(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
}

/// Splits `text` into its parts, enforcing the strict grammar.
pub(crate) fn parse_parts(text: &[u8]) -> std::result::Result<NumberParts<'_>, &'static str> {
    let len = text.len();
    let mut i = 0;
    let negative = text.first() == Some(&b'-');
    if negative {
        i += 1;
    }
    let int_start = i;
    match text.get(i) {
        None => return Err("missing digits"),
        Some(b'0') => {
            i += 1;
            if matches!(text.get(i), Some(b'0'..=b'9')) {
                return Err("leading zeros are not allowed");
            }
        }
        Some(b'1'..=b'9') => {
            while i < len && text[i].is_ascii_digit() {
                i += 1;
            }
        }
        Some(b'+') => return Err("leading '+' is not allowed"),
        Some(_) => return Err("expected digit"),
    }
    let int = &text[int_start..i];

    let mut frac: &[u8] = &[];
    let has_frac = text.get(i) == Some(&b'.');
    if has_frac {
        i += 1;
        let start = i;
        while i < len && text[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return Err("missing digits after '.'");
        }
        frac = &text[start..i];
    }

    let mut exp = 0i64;
    let has_exp = matches!(text.get(i), Some(b'e' | b'E'));
    if has_exp {
        i += 1;
        let exp_negative = match text.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };
        let start = i;
        while i < len && text[i].is_ascii_digit() {
            if exp < EXP_LIMIT {
                exp = exp * 10 + i64::from(text[i] - b'0');
            }
            i += 1;
        }
        if i == start {
            return Err("missing digits in exponent");
        }
        if exp_negative {
            exp = -exp;
        }
    }

    if i != len {
        return Err("unexpected character in number");
    }
    Ok(NumberParts {
        negative,
        int,
        frac,
        exp,
        has_frac,
        has_exp,
    })
}

fn trim_trailing_zeros(digits: &[u8]) -> &[u8] {
    let end = digits
        .iter()
        .rposition(|&b| b != b'0')
        .map_or(0, |p| p + 1);
    &digits[..end]
}

/// Parses an integer of type `T`.
///
/// Exponent forms are accepted when the value is integral (`1e3`,
/// `1.50e2`); fractional values are rejected and out-of-range values fail
/// with [`Error::NumberOverflow`].
pub fn parse_int<T: JsonInt>(text: &[u8]) -> Result<T> {
    parse_int_at(text, 0)
}

pub(crate) fn parse_int_at<T: JsonInt>(text: &[u8], offset: u64) -> Result<T> {
    let parts = parse_parts(text).map_err(|msg| Error::invalid_number(offset, msg))?;
    int_from_parts(&parts, offset)
}

pub(crate) fn int_from_parts<T: JsonInt>(parts: &NumberParts<'_>, offset: u64) -> Result<T> {
    let overflow = || Error::number_overflow(offset, T::NAME);

    let (int, frac, mut exp) = if parts.has_frac || parts.has_exp {
        let frac = trim_trailing_zeros(parts.frac);
        let exp = parts.exp - frac.len() as i64;
        if frac.is_empty() {
            let int = trim_trailing_zeros(parts.int);
            (int, frac, exp + (parts.int.len() - int.len()) as i64)
        } else {
            (parts.int, frac, exp)
        }
    } else {
        (parts.int, parts.frac, 0)
    };

    let mut acc: i128 = 0;
    for &b in int.iter().chain(frac) {
        acc = acc
            .checked_mul(10)
            .and_then(|a| a.checked_add(i128::from(b - b'0')))
            .ok_or_else(overflow)?;
    }
    if acc != 0 {
        if exp < 0 {
            return Err(Error::invalid_number(
                offset,
                "fractional value for an integer target",
            ));
        }
        while exp > 0 {
            acc = acc.checked_mul(10).ok_or_else(overflow)?;
            exp -= 1;
        }
    }
    if parts.negative {
        acc = -acc;
    }
    T::try_from(acc).map_err(|_| overflow())
}

/// Parses the nearest `f64`; magnitudes beyond the float range overflow.
pub fn parse_f64(text: &[u8]) -> Result<f64> {
    parse_f64_at(text, 0)
}

pub(crate) fn parse_f64_at(text: &[u8], offset: u64) -> Result<f64> {
    parse_parts(text).map_err(|msg| Error::invalid_number(offset, msg))?;
    let value: f64 = ascii(text, offset)?
        .parse()
        .map_err(|_| Error::invalid_number(offset, "unparsable float"))?;
    if value.is_infinite() {
        return Err(Error::number_overflow(offset, "f64"));
    }
    Ok(value)
}

/// Parses the nearest `f32` directly from the text.
pub fn parse_f32(text: &[u8]) -> Result<f32> {
    parse_f32_at(text, 0)
}

pub(crate) fn parse_f32_at(text: &[u8], offset: u64) -> Result<f32> {
    parse_parts(text).map_err(|msg| Error::invalid_number(offset, msg))?;
    let value: f32 = ascii(text, offset)?
        .parse()
        .map_err(|_| Error::invalid_number(offset, "unparsable float"))?;
    if value.is_infinite() {
        return Err(Error::number_overflow(offset, "f32"));
    }
    Ok(value)
}

/// Parses a number as the requested kind.
pub fn parse_number(text: &[u8], kind: NumberKind) -> Result<Number> {
    parse_number_at(text, kind, 0)
}

pub(crate) fn parse_number_at(text: &[u8], kind: NumberKind, offset: u64) -> Result<Number> {
    match kind {
        NumberKind::Integer => parse_int_at::<i64>(text, offset).map(Number::Integer),
        NumberKind::Float => parse_f64_at(text, offset).map(Number::Float),
        NumberKind::Decimal => Decimal::parse_at(text, offset).map(Number::Decimal),
        NumberKind::Any => {
            let parts = parse_parts(text).map_err(|msg| Error::invalid_number(offset, msg))?;
            if !parts.has_frac && !parts.has_exp {
                if let Ok(v) = int_from_parts::<i64>(&parts, offset) {
                    return Ok(Number::Integer(v));
                }
            }
            Decimal::from_parts(&parts, offset).map(Number::Decimal)
        }
    }
}

fn ascii(text: &[u8], offset: u64) -> Result<&str> {
    std::str::from_utf8(text).map_err(|_| Error::InvalidUtf8 { offset })
}

/// Appends the decimal digits of `value`.
#[inline]
pub fn write_int<T: JsonInt>(out: &mut Vec<u8>, value: T) {
    let mut buffer = itoa::Buffer::new();
    out.extend_from_slice(buffer.format(value).as_bytes());
}

/// Appends the shortest round-trip text of a finite `f64`.
///
/// Non-finite values are the caller's concern; see
/// [`crate::NonFinitePolicy`].
#[inline]
pub fn write_f64(out: &mut Vec<u8>, value: f64) {
    let mut buffer = ryu::Buffer::new();
    out.extend_from_slice(buffer.format_finite(value).as_bytes());
}

/// Appends the shortest round-trip text of a finite `f32`.
#[inline]
pub fn write_f32(out: &mut Vec<u8>, value: f32) {
    let mut buffer = ryu::Buffer::new();
    out.extend_from_slice(buffer.format_finite(value).as_bytes());
}

/// Text used by the quoted policy for a non-finite float.
pub(crate) fn non_finite_text(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn grammar_violations() {
        for bad in ["", "-", "+1", "01", "-01", "1.", ".5", "1e", "1e+", "1.2.3", "1-2"] {
            assert!(parse_parts(bad.as_bytes()).is_err(), "{bad:?} accepted");
        }
        for good in ["0", "-0", "10", "0.5", "1e5", "1E+5", "1e-5", "-12.5e10"] {
            assert!(parse_parts(good.as_bytes()).is_ok(), "{good:?} rejected");
        }
    }

    #[test]
    fn integer_widths() {
        assert_eq!(parse_int::<i8>(b"-128").unwrap(), -128);
        assert_eq!(
            parse_int::<i8>(b"128").unwrap_err().kind(),
            ErrorKind::NumberOverflow
        );
        assert_eq!(
            parse_int::<u32>(b"-1").unwrap_err().kind(),
            ErrorKind::NumberOverflow
        );
        assert_eq!(parse_int::<i64>(b"-9223372036854775808").unwrap(), i64::MIN);
        assert_eq!(parse_int::<u64>(b"18446744073709551615").unwrap(), u64::MAX);
        assert!(parse_int::<u64>(b"18446744073709551616").is_err());
    }

    #[test]
    fn integral_exponents() {
        assert_eq!(parse_int::<i64>(b"1e3").unwrap(), 1000);
        assert_eq!(parse_int::<i64>(b"1.50e2").unwrap(), 150);
        assert_eq!(parse_int::<i64>(b"1200e-2").unwrap(), 12);
        assert_eq!(parse_int::<i64>(b"0.000").unwrap(), 0);
        assert_eq!(parse_int::<i64>(b"0e-999").unwrap(), 0);
        assert_eq!(
            parse_int::<i64>(b"125e-2").unwrap_err().kind(),
            ErrorKind::InvalidNumber
        );
        assert_eq!(
            parse_int::<i64>(b"1e400").unwrap_err().kind(),
            ErrorKind::NumberOverflow
        );
    }

    #[test]
    fn floats_are_nearest() {
        assert_eq!(parse_f64(b"0.1").unwrap(), 0.1);
        assert_eq!(parse_f64(b"-2.5e-3").unwrap(), -0.0025);
        assert_eq!(parse_f32(b"16777217").unwrap(), 16777216.0);
        assert!(parse_f64(b"1e400").is_err());
    }

    #[test]
    fn any_kind_picks_representation() {
        assert_eq!(parse_number(b"42", NumberKind::Any).unwrap(), Number::Integer(42));
        match parse_number(b"12345678901234567890123", NumberKind::Any).unwrap() {
            Number::Decimal(d) => assert_eq!(d.to_string(), "12345678901234567890123"),
            other => panic!("unexpected {other:?}"),
        }
        match parse_number(b"2.50", NumberKind::Any).unwrap() {
            Number::Decimal(d) => assert_eq!(d.to_string(), "2.50"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn emission() {
        let mut out = Vec::new();
        write_int(&mut out, -9_000_000_000i64);
        out.push(b',');
        write_f64(&mut out, 1.0);
        out.push(b',');
        write_f32(&mut out, 0.3);
        assert_eq!(out, b"-9000000000,1.0,0.3");
    }
}
