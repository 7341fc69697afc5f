//! Error types for JSON reading, writing and converter lookup.
//!
//! Every failure surfaces as a single [`Error`] family. Input-side variants
//! carry the absolute byte offset where the problem was detected plus an
//! expected-vs-found description, so a single-line diagnostic can always be
//! rendered.
//!
//! ## Error Categories
//!
//! - **Tokenizer errors**: [`Error::UnexpectedEnd`], [`Error::InvalidToken`],
//!   [`Error::InvalidEscape`], [`Error::InvalidUtf8`]
//! - **Numeric errors**: [`Error::InvalidNumber`], [`Error::NumberOverflow`],
//!   [`Error::NonFiniteNumber`]
//! - **Binding errors**: [`Error::UnknownField`], [`Error::MissingField`],
//!   [`Error::NoConverterFound`]
//! - **Resource errors**: [`Error::LimitExceeded`], [`Error::Io`]
//!
//! Legitimate absence (`null`) is never reported through this type; nullable
//! reads return `Option<T>` instead.
//!
//! ## Examples
//!
//! ```rust
//! use jsonbind::{from_str, ErrorKind};
//!
//! let err = from_str::<Vec<i32>>("[1, 2,").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::UnexpectedEnd);
//! assert_eq!(err.offset(), Some(6));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors raised by the codec runtime.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Input exhausted mid-token or mid-structure.
    #[error("Unexpected end of input at offset {offset}: expected {expected}")]
    UnexpectedEnd { offset: u64, expected: String },

    /// The byte at `offset` does not start anything valid in this position.
    #[error("Invalid token at offset {offset}: expected {expected}, found {found}")]
    InvalidToken {
        offset: u64,
        expected: String,
        found: String,
    },

    /// Malformed string escape or unpaired UTF-16 surrogate.
    #[error("Invalid escape at offset {offset}: {msg}")]
    InvalidEscape { offset: u64, msg: String },

    /// String content is not valid UTF-8.
    #[error("Invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    /// Numeric literal violates the JSON number grammar or the target kind.
    #[error("Invalid number at offset {offset}: {msg}")]
    InvalidNumber { offset: u64, msg: String },

    /// Integral value does not fit the requested width.
    #[error("Number overflow at offset {offset}: value does not fit {target}")]
    NumberOverflow { offset: u64, target: &'static str },

    /// NaN or an infinity reached a writer whose policy rejects them.
    #[error("Non-finite number {0} cannot be written as JSON")]
    NonFiniteNumber(String),

    /// Object contained a property the bound type does not declare.
    #[error("Unknown field '{name}' at offset {offset} while reading {type_name}")]
    UnknownField {
        offset: u64,
        name: String,
        type_name: String,
    },

    /// Object ended without a property the bound type requires.
    #[error("Missing mandatory field '{name}' at offset {offset} while reading {type_name}")]
    MissingField {
        offset: u64,
        name: String,
        type_name: String,
    },

    /// Registry exhausted exact matches and every factory.
    #[error("No converter found for {0}")]
    NoConverterFound(String),

    /// A configured ceiling (buffer size, nesting depth) was hit.
    #[error("Limit exceeded at offset {offset}: {msg}")]
    LimitExceeded { offset: u64, msg: String },

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

/// Flat classification of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnexpectedEnd,
    InvalidToken,
    InvalidEscape,
    InvalidUtf8,
    InvalidNumber,
    NumberOverflow,
    NonFiniteNumber,
    UnknownField,
    MissingField,
    NoConverterFound,
    LimitExceeded,
    Io,
    Custom,
}

impl Error {
    /// Creates an end-of-input error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Error;
    ///
    /// let err = Error::unexpected_end(10, "','");
    /// assert!(err.to_string().contains("offset 10"));
    /// ```
    pub fn unexpected_end(offset: u64, expected: &str) -> Self {
        Error::UnexpectedEnd {
            offset,
            expected: expected.to_string(),
        }
    }

    /// Creates an invalid-token error, rendering `found` as a readable byte.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Error;
    ///
    /// let err = Error::invalid_token(3, "':'", b'x');
    /// assert!(err.to_string().contains("found 'x'"));
    /// ```
    pub fn invalid_token(offset: u64, expected: &str, found: u8) -> Self {
        Error::InvalidToken {
            offset,
            expected: expected.to_string(),
            found: describe_byte(found),
        }
    }

    /// Creates an invalid-escape error.
    pub fn invalid_escape(offset: u64, msg: &str) -> Self {
        Error::InvalidEscape {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an invalid-number error.
    pub fn invalid_number(offset: u64, msg: &str) -> Self {
        Error::InvalidNumber {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an overflow error for an integral target type.
    pub fn number_overflow(offset: u64, target: &'static str) -> Self {
        Error::NumberOverflow { offset, target }
    }

    /// Creates an unknown-field error.
    pub fn unknown_field(offset: u64, name: &str, type_name: &str) -> Self {
        Error::UnknownField {
            offset,
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }

    /// Creates a missing-field error.
    pub fn missing_field(offset: u64, name: &str, type_name: &str) -> Self {
        Error::MissingField {
            offset,
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }

    /// Creates a lookup failure for the given type description.
    pub fn no_converter(description: impl fmt::Display) -> Self {
        Error::NoConverterFound(description.to_string())
    }

    /// Creates a limit error.
    pub fn limit_exceeded(offset: u64, msg: &str) -> Self {
        Error::LimitExceeded {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for stream reading/writing failures.
    pub fn io(err: &std::io::Error) -> Self {
        Error::Io(err.to_string())
    }

    /// Byte offset in the input where the error was detected, if any.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        match self {
            Error::UnexpectedEnd { offset, .. }
            | Error::InvalidToken { offset, .. }
            | Error::InvalidEscape { offset, .. }
            | Error::InvalidUtf8 { offset }
            | Error::InvalidNumber { offset, .. }
            | Error::NumberOverflow { offset, .. }
            | Error::UnknownField { offset, .. }
            | Error::MissingField { offset, .. }
            | Error::LimitExceeded { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Returns the flat classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnexpectedEnd { .. } => ErrorKind::UnexpectedEnd,
            Error::InvalidToken { .. } => ErrorKind::InvalidToken,
            Error::InvalidEscape { .. } => ErrorKind::InvalidEscape,
            Error::InvalidUtf8 { .. } => ErrorKind::InvalidUtf8,
            Error::InvalidNumber { .. } => ErrorKind::InvalidNumber,
            Error::NumberOverflow { .. } => ErrorKind::NumberOverflow,
            Error::NonFiniteNumber(_) => ErrorKind::NonFiniteNumber,
            Error::UnknownField { .. } => ErrorKind::UnknownField,
            Error::MissingField { .. } => ErrorKind::MissingField,
            Error::NoConverterFound(_) => ErrorKind::NoConverterFound,
            Error::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Error::Io(_) => ErrorKind::Io,
            Error::Custom(_) => ErrorKind::Custom,
        }
    }

    /// Returns `true` if the input simply ran out.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::UnexpectedEnd { .. })
    }
}

fn describe_byte(b: u8) -> String {
    match b {
        b' '..=b'~' => format!("'{}'", b as char),
        _ => format!("byte 0x{:02x}", b),
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(&err)
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
