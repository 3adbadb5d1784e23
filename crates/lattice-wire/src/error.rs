//! # Wire Errors
//!
//! A decode error aborts only the message being decoded.

use thiserror::Error;

/// Failure to decode a wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer ended before the value did.
    #[error("Truncated payload: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A marker byte of the wrong family was found.
    #[error("Unexpected marker 0x{found:02x}, expected {expected}")]
    UnexpectedMarker { expected: &'static str, found: u8 },

    /// A string was not valid UTF-8.
    #[error("Invalid UTF-8 in string")]
    InvalidUtf8,

    /// An explicit entity tag named no known kind.
    #[error("Invalid entity kind: {0}")]
    InvalidEntityKind(i64),

    /// A required field was absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field held a value outside its domain.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// Containers nested deeper than [`crate::MAX_NESTING_DEPTH`].
    #[error("Maximum nesting depth exceeded")]
    NestingTooDeep,

    /// An integer did not fit the requested width.
    #[error("Integer overflow")]
    IntegerOverflow,
}
