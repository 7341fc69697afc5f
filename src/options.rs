//! Configuration options for the JSON codec.
//!
//! This module provides types to customize how readers, writers and object
//! descriptions behave:
//!
//! - [`Options`]: Main configuration struct
//! - [`NonFinitePolicy`]: What a writer does with `NaN` and the infinities
//! - [`UnknownFieldPolicy`]: What an object reader does with undeclared keys
//!
//! ## Examples
//!
//! ```rust
//! use jsonbind::{Engine, NonFinitePolicy, Options};
//!
//! let options = Options::new().with_non_finite(NonFinitePolicy::Null);
//! let engine = Engine::with_options(options);
//! assert_eq!(engine.to_string(&f64::NAN).unwrap(), "null");
//! ```

/// Policy for floating-point values that have no JSON number form.
///
/// - **Error**: Default, the write fails with [`crate::Error::NonFiniteNumber`]
/// - **Null**: The value is written as `null`
/// - **Quoted**: The value is written as `"NaN"`, `"Infinity"` or `"-Infinity"`,
///   which the float readers accept back
///
/// # Examples
///
/// ```rust
/// use jsonbind::NonFinitePolicy;
///
/// assert_eq!(NonFinitePolicy::default(), NonFinitePolicy::Error);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NonFinitePolicy {
    #[default]
    Error,
    Null,
    Quoted,
}

/// Policy for object properties a bound type does not declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    #[default]
    Skip,
    Fail,
}

/// Configuration options for reading and writing JSON.
///
/// # Examples
///
/// ```rust
/// use jsonbind::{Options, UnknownFieldPolicy};
///
/// let options = Options::new()
///     .with_buffer_size(256)
///     .with_max_depth(64)
///     .with_unknown_fields(UnknownFieldPolicy::Fail);
/// assert_eq!(options.buffer_size, 256);
/// ```
#[derive(Clone, Debug)]
pub struct Options {
    /// Initial size of stream-reader and writer buffers.
    pub buffer_size: usize,
    /// Ceiling for stream-reader buffer growth.
    pub max_buffer_size: usize,
    /// Maximum nesting of arrays and objects.
    pub max_depth: usize,
    pub non_finite: NonFinitePolicy,
    pub unknown_fields: UnknownFieldPolicy,
    /// Accept the positional array encoding for described objects.
    pub allow_array_format: bool,
    /// Emit described objects in array encoding when they support it.
    pub prefer_array_format: bool,
    /// Buffered bytes at which a sink-bound writer flushes.
    pub flush_threshold: usize,
    /// Number of idle buffers the engine keeps for reuse.
    pub pool_size: usize,
    /// Largest digit count an arbitrary-precision integer may expand to.
    pub max_number_digits: usize,
    /// Leave out object fields holding `null` or their type's default.
    pub omit_defaults: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            buffer_size: 4096,
            max_buffer_size: 128 * 1024 * 1024,
            max_depth: 512,
            non_finite: NonFinitePolicy::default(),
            unknown_fields: UnknownFieldPolicy::default(),
            allow_array_format: true,
            prefer_array_format: false,
            flush_threshold: 64 * 1024,
            pool_size: 16,
            max_number_digits: 4096,
            omit_defaults: false,
        }
    }
}

impl Options {
    /// Creates default options.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Options;
    ///
    /// let options = Options::new();
    /// assert_eq!(options.buffer_size, 4096);
    /// assert_eq!(options.max_depth, 512);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial buffer size. Values below 1 are raised to 1.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Options;
    ///
    /// assert_eq!(Options::new().with_buffer_size(0).buffer_size, 1);
    /// ```
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Sets the ceiling stream buffers may grow to while holding one token.
    #[must_use]
    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size.max(1);
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the policy for `NaN` and infinities.
    #[must_use]
    pub fn with_non_finite(mut self, policy: NonFinitePolicy) -> Self {
        self.non_finite = policy;
        self
    }

    /// Sets the policy for undeclared object properties.
    #[must_use]
    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Enables or disables reading objects in array encoding.
    #[must_use]
    pub fn with_array_format(mut self, allow: bool) -> Self {
        self.allow_array_format = allow;
        self
    }

    /// Makes writers emit array encoding for objects that support it.
    ///
    /// Also enables reading array encoding.
    #[must_use]
    pub fn with_prefer_array_format(mut self, prefer: bool) -> Self {
        self.prefer_array_format = prefer;
        if prefer {
            self.allow_array_format = true;
        }
        self
    }

    /// Sets the flush point for sink-bound writers.
    #[must_use]
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    /// Sets how many idle buffers the engine pool keeps.
    #[must_use]
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Caps the digits `1e400`-style input may expand to when read as a
    /// big integer.
    #[must_use]
    pub fn with_max_number_digits(mut self, digits: usize) -> Self {
        self.max_number_digits = digits;
        self
    }

    /// Skips described-object fields whose value is `null` or equals the
    /// type's registered default.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsonbind::Options;
    ///
    /// assert!(Options::new().with_omit_defaults(true).omit_defaults);
    /// ```
    #[must_use]
    pub fn with_omit_defaults(mut self, omit: bool) -> Self {
        self.omit_defaults = omit;
        self
    }
}
