//! Arbitrary-precision decimal numbers.
//!
//! A [`Decimal`] is an unscaled integer plus a decimal scale, so
//! `value = unscaled × 10^-scale`. Parsing and formatting work on the digit
//! sequence directly and never pass through binary floating point, which
//! means a parse → format → parse cycle is exact digit for digit.
//!
//! ## Canonical text
//!
//! Formatting uses plain notation when the scale is non-negative and the
//! adjusted exponent is at least `-6`, and scientific notation otherwise:
//!
//! ```rust
//! use jsonbind::Decimal;
//!
//! assert_eq!("1E28".parse::<Decimal>().unwrap().to_string(), "1E+28");
//! assert_eq!("12.50".parse::<Decimal>().unwrap().to_string(), "12.50");
//! assert_eq!("0.000000012".parse::<Decimal>().unwrap().to_string(), "1.2E-8");
//! ```
//!
//! Equality is structural: `1.0` and `1.00` have different scales and are
//! not equal.

use crate::error::{Error, Result};
use crate::number;
use num_bigint::{BigInt, Sign};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Name under which a [`Decimal`] travels through serde so the crate's own
/// serializer and deserializer can move its digits without conversion.
pub(crate) const DECIMAL_TOKEN: &str = "$jsonbind::private::Decimal";

/// An exact decimal number: unscaled digits and a scale.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: BigInt,
    scale: i32,
}

impl Decimal {
    /// Creates a decimal equal to `unscaled × 10^-scale`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Decimal;
    /// use num_bigint::BigInt;
    ///
    /// let d = Decimal::new(BigInt::from(-1205), 2);
    /// assert_eq!(d.to_string(), "-12.05");
    /// ```
    #[must_use]
    pub fn new(unscaled: BigInt, scale: i32) -> Self {
        Decimal { unscaled, scale }
    }

    #[must_use]
    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    #[must_use]
    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Parses a decimal from strict JSON number text.
    pub fn parse(text: &[u8]) -> Result<Self> {
        Self::parse_at(text, 0)
    }

    pub(crate) fn parse_at(text: &[u8], offset: u64) -> Result<Self> {
        let parts = number::parse_parts(text).map_err(|msg| Error::invalid_number(offset, msg))?;
        Self::from_parts(&parts, offset)
    }

    pub(crate) fn from_parts(parts: &number::NumberParts<'_>, offset: u64) -> Result<Self> {
        let mut digits = Vec::with_capacity(parts.int.len() + parts.frac.len());
        digits.extend_from_slice(parts.int);
        digits.extend_from_slice(parts.frac);
        let magnitude = BigInt::parse_bytes(&digits, 10)
            .ok_or_else(|| Error::invalid_number(offset, "expected digits"))?;
        let scale = parts.frac.len() as i64 - parts.exp;
        let scale = i32::try_from(scale)
            .map_err(|_| Error::invalid_number(offset, "exponent out of range"))?;
        let unscaled = if parts.negative { -magnitude } else { magnitude };
        Ok(Decimal { unscaled, scale })
    }

    /// Converts a finite float through its shortest round-trip text.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Decimal;
    ///
    /// assert_eq!(Decimal::from_f64(0.1).unwrap().to_string(), "0.1");
    /// assert!(Decimal::from_f64(f64::NAN).is_none());
    /// ```
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let mut buffer = ryu::Buffer::new();
        Self::parse(buffer.format_finite(value).as_bytes()).ok()
    }

    /// Nearest `f64`. Values beyond the float range become infinite.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Returns the value as `i64` when it is integral and in range.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        if self.unscaled.sign() == Sign::NoSign {
            return Some(0);
        }
        let shift = self.scale.unsigned_abs();
        if self.scale <= 0 {
            if shift > 18 {
                return None;
            }
            let factor = BigInt::from(10u8).pow(shift);
            return i64::try_from(&(&self.unscaled * factor)).ok();
        }
        if u64::from(shift) >= self.unscaled.bits() {
            return None;
        }
        let divisor = BigInt::from(10u8).pow(shift);
        let (quotient, remainder) = (&self.unscaled / &divisor, &self.unscaled % &divisor);
        if remainder.sign() != Sign::NoSign {
            return None;
        }
        i64::try_from(&quotient).ok()
    }

    pub fn is_negative(&self) -> bool {
        self.unscaled.sign() == Sign::Minus
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::new(BigInt::from(value), 0)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal::new(BigInt::from(value), 0)
    }
}

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Decimal::new(value, 0)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Decimal::parse(s.as_bytes())
    }
}

impl Decimal {
    /// Appends the canonical text to `out`.
    pub(crate) fn write_canonical(&self, out: &mut Vec<u8>) {
        let mut small = itoa::Buffer::new();
        let large: Vec<u8>;
        let digits: &[u8] = match u128::try_from(self.unscaled.magnitude()) {
            Ok(magnitude) => small.format(magnitude).as_bytes(),
            Err(_) => {
                large = self
                    .unscaled
                    .magnitude()
                    .to_radix_be(10)
                    .into_iter()
                    .map(|d| d + b'0')
                    .collect();
                &large
            }
        };
        let len = digits.len() as i64;
        let scale = i64::from(self.scale);
        let adjusted = len - 1 - scale;

        out.reserve(digits.len() + 8);
        if self.is_negative() {
            out.push(b'-');
        }
        if scale == 0 {
            out.extend_from_slice(digits);
        } else if scale > 0 && adjusted >= -6 {
            let point = len - scale;
            if point > 0 {
                let (head, tail) = digits.split_at(point as usize);
                out.extend_from_slice(head);
                out.push(b'.');
                out.extend_from_slice(tail);
            } else {
                out.extend_from_slice(b"0.");
                out.resize(out.len() + (-point) as usize, b'0');
                out.extend_from_slice(digits);
            }
        } else {
            let (first, rest) = digits.split_at(1);
            out.extend_from_slice(first);
            if !rest.is_empty() {
                out.push(b'.');
                out.extend_from_slice(rest);
            }
            out.push(b'E');
            if adjusted >= 0 {
                out.push(b'+');
            }
            out.extend_from_slice(itoa::Buffer::new().format(adjusted).as_bytes());
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        self.write_canonical(&mut out);
        f.write_str(std::str::from_utf8(&out).map_err(|_| fmt::Error)?)
    }
}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(DECIMAL_TOKEN, &self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_newtype_struct(DECIMAL_TOKEN, DecimalVisitor)
    }
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a decimal number")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Decimal, E> {
        Ok(Decimal::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Decimal, E> {
        Ok(Decimal::from(value))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Decimal, E> {
        Decimal::from_f64(value).ok_or_else(|| E::custom("non-finite decimal"))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Decimal, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> std::result::Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(text: &str) -> String {
        text.parse::<Decimal>().unwrap().to_string()
    }

    #[test]
    fn plain_and_scientific_forms() {
        assert_eq!(canonical("0"), "0");
        assert_eq!(canonical("-0.5"), "-0.5");
        assert_eq!(canonical("123.456"), "123.456");
        assert_eq!(canonical("0.00000123"), "0.00000123");
        assert_eq!(canonical("0.000000123"), "1.23E-7");
        assert_eq!(canonical("1E28"), "1E+28");
        assert_eq!(canonical("12345e3"), "1.2345E+7");
        assert_eq!(canonical("1.5e-2"), "0.015");
    }

    #[test]
    fn scale_is_preserved() {
        let a: Decimal = "1.0".parse().unwrap();
        let b: Decimal = "1.00".parse().unwrap();
        assert_ne!(a, b);
        assert_eq!(b.scale(), 2);
        assert_eq!(b.to_string(), "1.00");
    }

    #[test]
    fn reparse_is_exact() {
        for text in ["3.141592653589793238462643383279", "-1E-300", "9.99E+99999"] {
            let first: Decimal = text.parse().unwrap();
            let second: Decimal = first.to_string().parse().unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn integral_conversion() {
        assert_eq!(canonical_i64("1.50e2"), Some(150));
        assert_eq!(canonical_i64("1.5"), None);
        assert_eq!(canonical_i64("-12E1"), Some(-120));
        assert_eq!(canonical_i64("1E30"), None);
        assert_eq!(canonical_i64("0e-2147483647"), Some(0));
    }

    #[test]
    fn huge_exponents_stay_cheap() {
        assert_eq!(canonical_i64("1e2147483647"), None);
        assert_eq!(canonical_i64("1e-2147483647"), None);
        assert_eq!(canonical_i64("123e-4000000"), None);
        assert_eq!(canonical("1e2147483647"), "1E+2147483647");
    }

    fn canonical_i64(text: &str) -> Option<i64> {
        text.parse::<Decimal>().unwrap().to_i64()
    }

    #[test]
    fn rejects_bad_grammar() {
        assert!("+1".parse::<Decimal>().is_err());
        assert!("01".parse::<Decimal>().is_err());
        assert!("1.".parse::<Decimal>().is_err());
    }
}
