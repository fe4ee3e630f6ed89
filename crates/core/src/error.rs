//! Error kinds shared by every layer of the data model.
//!
//! All failures surface as one typed enum; nothing is encoded in return
//! values as magic sentinels. Errors are fatal to the operation that raised
//! them: a failed mutation leaves its target unchanged, and a failed
//! finalize frees the partially written buffer.

use std::fmt;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Error raised by heap, buffer, and packet operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Operation requires a different semantic type
    /// (e.g. `integer_value()` on a string, `get(key)` on a non-object).
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// `at(key)` missed on an object.
    NotFound { key: String },
    /// Array `at`/`insert` past the end.
    OutOfRange { index: usize, len: usize },
    /// Malformed input to an otherwise well-typed operation
    /// (oversized key, builder misuse, unrepresentable number).
    InvalidArgument(String),
    /// Raw bytes failed buffer validation.
    Validation(String),
    /// External parser input was ill-formed.
    Parse(String),
    /// The aligned allocator reported exhaustion.
    AllocationFailed { bytes: usize },
    /// Operation requires the other representation
    /// (e.g. borrowing buffer bytes from a non-finalized packet).
    State(&'static str),
}

impl Error {
    /// Shorthand for the most common error kind.
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Error::TypeMismatch { expected, found }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            Error::NotFound { key } => write!(f, "key not found: {key:?}"),
            Error::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::Validation(msg) => write!(f, "buffer validation failed: {msg}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::AllocationFailed { bytes } => {
                write!(f, "aligned allocation of {bytes} bytes failed")
            }
            Error::State(msg) => write!(f, "invalid state: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
